//! The directory new modules are installed into.

use std::path::{Path, PathBuf};

use crate::errors::ModuleToolError;

#[derive(Debug, Clone)]
pub struct InstallDirectory {
    target: PathBuf,
}

impl InstallDirectory {
    pub fn new(target: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Make sure the target exists and is a directory, creating it if needed.
    ///
    /// `name` and `requested` describe the install for error messages.
    pub fn prepare(&self, name: &str, requested: &str) -> Result<(), ModuleToolError> {
        if self.target.exists() {
            if self.target.is_dir() {
                return Ok(());
            }
            return Err(ModuleToolError::Failed {
                message: format!(
                    "Could not install '{name}' ({requested}); '{}' exists but is not a directory",
                    self.target.display()
                ),
            });
        }
        tracing::debug!("creating install directory {}", self.target.display());
        std::fs::create_dir_all(&self.target).map_err(|e| ModuleToolError::Failed {
            message: format!(
                "Could not install '{name}' ({requested}); cannot create directory '{}': {e}",
                self.target.display()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = InstallDirectory::new(&tmp.path().join("a").join("modules"));
        dir.prepare("a-b", "latest").unwrap();
        assert!(dir.target().is_dir());
    }

    #[test]
    fn existing_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("modules");
        std::fs::write(&path, "not a dir").unwrap();
        let err = InstallDirectory::new(&path).prepare("a-b", "latest").unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }
}
