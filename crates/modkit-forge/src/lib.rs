//! Module registry protocol: the paginated v3 JSON API, release download
//! with retries, checksum verification, archive unpacking, and the
//! [`Source`](modkit_resolver::Source) implementations backed by the registry
//! and by local release archives.

pub mod api;
pub mod archive;
pub mod cache;
pub mod checksum;
pub mod client;
pub mod download;
pub mod local;
pub mod repository;
pub mod source;

pub use client::ForgeClient;
pub use local::LocalArchiveSource;
pub use source::ForgeSource;
