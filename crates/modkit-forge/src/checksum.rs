//! Release archive checksum verification.

use std::path::Path;

use modkit_util::errors::ModkitError;
use modkit_util::hash;

/// Check that the MD5 digest of `file` equals `expected`.
///
/// `name` identifies the release in the error message.
pub fn verify_md5(file: &Path, expected: &str, name: &str) -> miette::Result<()> {
    let actual = hash::md5_file(file).map_err(ModkitError::Io)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        tracing::debug!("MD5 ok for {name}");
        Ok(())
    } else {
        Err(ModkitError::ChecksumMismatch {
            name: name.to_string(),
            expected: expected.trim().to_string(),
            actual,
        }
        .into())
    }
}
