//! Release archive (`.tar.gz`) extraction.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use modkit_core::METADATA_FILE;
use modkit_util::errors::ModkitError;

/// Extract a gzipped tarball into `dest` and return the module root: `dest`
/// itself, or the top-level directory that holds `metadata.json`.
///
/// Entries that would land outside `dest` are rejected.
pub fn unpack(archive: &Path, dest: &Path) -> miette::Result<PathBuf> {
    let unpack_err = |message: String| ModkitError::Unpack { message };

    let file = File::open(archive)
        .map_err(|e| unpack_err(format!("failed to open {}: {e}", archive.display())))?;
    let mut tarball = Archive::new(GzDecoder::new(file));
    std::fs::create_dir_all(dest).map_err(ModkitError::Io)?;

    let entries = tarball
        .entries()
        .map_err(|e| unpack_err(format!("failed to read {}: {e}", archive.display())))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| unpack_err(format!("bad archive entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| unpack_err(format!("invalid entry path: {e}")))?
            .to_path_buf();
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| unpack_err(format!("failed to extract {}: {e}", path.display())))?;
        if !unpacked {
            return Err(unpack_err(format!(
                "entry {} escapes the extraction directory",
                path.display()
            ))
            .into());
        }
    }

    find_module_root(dest).ok_or_else(|| {
        unpack_err(format!("no {METADATA_FILE} found in {}", archive.display())).into()
    })
}

/// `dir` if it holds `metadata.json`, else the first (by name) immediate
/// subdirectory that does.
pub fn find_module_root(dir: &Path) -> Option<PathBuf> {
    if dir.join(METADATA_FILE).is_file() {
        return Some(dir.to_path_buf());
    }
    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();
    children.into_iter().find(|p| p.join(METADATA_FILE).is_file())
}
