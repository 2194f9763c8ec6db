//! Core data types for modkit.
//!
//! This crate defines the module-level types shared by the resolver, the
//! registry client and the operations layer: `metadata.json` parsing, module
//! name handling and global configuration.
//!
//! This crate is intentionally free of async code and network I/O.

/// File name of the metadata document at the root of every module.
pub const METADATA_FILE: &str = "metadata.json";

/// File name of the per-file checksum document shipped in module releases.
pub const CHECKSUMS_FILE: &str = "checksums.json";

pub mod config;
pub mod metadata;
pub mod name;
