//! Dependency resolution engine: semantic versions and ranges, release
//! sources, the constraint graph and the backtracking resolver.
//!
//! Resolution itself is synchronous and does no I/O; only
//! [`ConstraintGraph::query`] and [`Release::prepare`] touch sources.

pub mod conflict;
pub mod graph;
pub mod release;
pub mod resolver;
pub mod version;

pub use conflict::{Rejection, Unsatisfiable};
pub use graph::{CandidateOrder, ConstraintGraph};
pub use release::{Artifact, Release, Source, Staged};
pub use resolver::{resolve, Selection};
pub use version::{Version, VersionRange};
