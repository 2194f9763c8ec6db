//! Shared utilities for modkit.
//!
//! This crate provides cross-cutting concerns used by all other modkit crates:
//! error types, filesystem helpers, checksums, and terminal progress output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
