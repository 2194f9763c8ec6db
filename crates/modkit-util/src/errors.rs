use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all modkit library operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ModkitError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A module's `metadata.json` is missing or malformed.
    #[error("Metadata error: {message}")]
    #[diagnostic(help("Check the module's metadata.json for syntax errors"))]
    Metadata { message: String },

    /// A version string could not be parsed.
    #[error("Malformed version '{input}': {reason}")]
    MalformedVersion { input: String, reason: String },

    /// A version range expression could not be parsed.
    #[error("Malformed version range '{input}': {reason}")]
    #[diagnostic(help("Use forms like '1.2.3', '>= 1.0.0 < 2.0.0', '1.x' or '~1.2'"))]
    MalformedRange { input: String, reason: String },

    /// Dependency resolution failed.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// A downloaded archive did not match its published checksum.
    #[error("Downloaded release for {name} did not match expected checksum (expected {expected}, got {actual})")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// An archive could not be extracted.
    #[error("Could not extract contents of module archive: {message}")]
    Unpack { message: String },

    /// Global configuration could not be read.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.modkit/config.toml"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ModkitResult<T> = miette::Result<T>;
