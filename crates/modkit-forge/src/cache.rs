//! The working directory holding downloads and staged releases.

use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};

use modkit_util::errors::ModkitError;
use modkit_util::fs::ensure_dir;

/// Scratch space for downloads and unpacked releases.
///
/// Keep this on the same filesystem as the install targets when possible so
/// that installing a staged release is a rename.
#[derive(Debug, Clone)]
pub struct WorkingDir {
    root: PathBuf,
}

impl WorkingDir {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    /// Remove leftovers of earlier runs.
    pub fn clean(&self) -> miette::Result<()> {
        for dir in [self.downloads_dir(), self.staging_dir()] {
            if dir.exists() {
                tracing::debug!("cleaning {}", dir.display());
                std::fs::remove_dir_all(&dir).map_err(ModkitError::Io)?;
            }
        }
        Ok(())
    }

    /// A fresh download target, removed when dropped.
    pub fn download_file(&self, prefix: &str) -> miette::Result<NamedTempFile> {
        let dir = self.downloads_dir();
        ensure_dir(&dir).map_err(ModkitError::Io)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".tar.gz")
            .tempfile_in(&dir)
            .map_err(|e| ModkitError::Io(e).into())
    }

    /// A fresh staging directory, removed when dropped.
    pub fn staging(&self, prefix: &str) -> miette::Result<TempDir> {
        let dir = self.staging_dir();
        ensure_dir(&dir).map_err(ModkitError::Io)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&dir)
            .map_err(|e| ModkitError::Io(e).into())
    }
}
