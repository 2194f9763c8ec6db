//! A release archive on the local filesystem as a [`Source`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use modkit_core::metadata::ModuleMetadata;
use modkit_resolver::release::PRIORITY_LOCAL;
use modkit_resolver::{Release, Source, Staged};
use modkit_util::errors::ModkitResult;

use crate::archive;
use crate::cache::WorkingDir;

/// Offers the single release contained in a `.tar.gz` archive.
pub struct LocalArchiveSource {
    path: PathBuf,
    metadata: ModuleMetadata,
    working_dir: WorkingDir,
}

impl LocalArchiveSource {
    /// Read the archive's metadata by unpacking it once.
    pub fn open(path: &Path, working_dir: WorkingDir) -> ModkitResult<Self> {
        let dir = working_dir.staging("archive-")?;
        let root = archive::unpack(path, dir.path())?;
        let metadata = ModuleMetadata::from_dir(&root)?;
        tracing::debug!(
            "{} contains {} {}",
            path.display(),
            metadata.full_name(),
            metadata.version
        );
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            working_dir,
        })
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn full_name(&self) -> String {
        self.metadata.full_name()
    }
}

#[async_trait]
impl Source for LocalArchiveSource {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn priority(&self) -> i32 {
        PRIORITY_LOCAL
    }

    async fn fetch(self: Arc<Self>, name: String) -> ModkitResult<Vec<Release>> {
        if name != self.full_name() {
            return Ok(Vec::new());
        }
        let metadata = self.metadata.clone();
        let source: Arc<dyn Source> = self;
        Ok(vec![Release::from_metadata(source, metadata)?])
    }

    async fn stage(&self, release: &Release) -> ModkitResult<Staged> {
        let dir = self
            .working_dir
            .staging(&format!("{}-{}-", release.name(), release.version()))?;
        let root = archive::unpack(&self.path, dir.path())?;
        Ok(Staged { dir, root })
    }
}
