use std::path::Path;

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Move `source` into place at `target`, replacing whatever is there.
///
/// An existing `target` is first moved aside into a temporary directory
/// under the same parent. If moving `source` into place fails, the previous
/// contents are restored. The aside copy is removed once the new contents
/// are in place.
pub fn replace_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    let parent = target.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", target.display()),
        )
    })?;
    ensure_dir(parent)?;

    let aside = tempfile::Builder::new().prefix(".replace-").tempdir_in(parent)?;
    let backup = aside.path().join("previous");
    let had_previous = target.exists();
    if had_previous {
        std::fs::rename(target, &backup)?;
    }

    if let Err(e) = move_dir(source, target) {
        if had_previous {
            if let Err(restore) = std::fs::rename(&backup, target) {
                tracing::error!(
                    "failed to restore {} after a failed replace: {restore}",
                    target.display()
                );
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Rename `source` to `target`, copying across filesystems when a plain
/// rename is not possible.
pub fn move_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    match std::fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(
                "rename {} -> {} failed ({e}), copying instead",
                source.display(),
                target.display()
            );
            if let Err(copy_err) = copy_dir_all(source, target) {
                let _ = std::fs::remove_dir_all(target);
                return Err(copy_err);
            }
            std::fs::remove_dir_all(source)
        }
    }
}

/// Recursively copy the directory tree at `source` to `target`.
pub fn copy_dir_all(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
