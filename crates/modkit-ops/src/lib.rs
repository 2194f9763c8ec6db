//! High-level operations for modkit.
//!
//! Each `ops_*` module implements one user-facing command on top of the
//! resolver and registry crates. Install and upgrade never return an error;
//! their outcome is an [`report::OperationReport`].

pub mod errors;
pub mod install_dir;
pub mod installed;
pub mod ops_install;
pub mod ops_search;
pub mod ops_upgrade;
pub mod report;

mod shared;
