//! Candidate releases and the sources that provide them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use modkit_core::metadata::ModuleMetadata;
use modkit_core::name;
use modkit_util::errors::{ModkitError, ModkitResult};

use crate::version::{Version, VersionRange};

/// Priority of the already-installed module index.
pub const PRIORITY_INSTALLED: i32 = 0;
/// Priority of a local archive named on the command line.
pub const PRIORITY_LOCAL: i32 = 10;
/// Priority of the remote registry.
pub const PRIORITY_REGISTRY: i32 = 20;

/// A provider of candidate releases.
///
/// `fetch` takes `Arc<Self>` so implementations can hand each release a
/// reference back to its source and so fetches can be spawned as tasks.
#[async_trait]
pub trait Source: Send + Sync {
    /// Human-readable identifier, e.g. the registry URL or archive path.
    fn label(&self) -> String;

    /// Lower sorts first.
    fn priority(&self) -> i32;

    /// All releases of `name` this source knows about. Unknown names yield an
    /// empty list, not an error.
    async fn fetch(self: Arc<Self>, name: String) -> ModkitResult<Vec<Release>>;

    /// Download, verify and unpack `release` into a fresh staging directory.
    async fn stage(&self, release: &Release) -> ModkitResult<Staged>;
}

/// Unpacked release content awaiting installation.
///
/// Dropping a `Staged` removes its directory.
#[derive(Debug)]
pub struct Staged {
    pub dir: TempDir,
    /// The module root inside `dir` (the directory holding `metadata.json`).
    pub root: PathBuf,
}

/// Where a release's archive can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub uri: String,
    /// Published MD5 digest of the archive.
    pub checksum: Option<String>,
}

/// One version of one module, as offered by a [`Source`].
pub struct Release {
    name: String,
    version: Version,
    dependencies: BTreeMap<String, VersionRange>,
    metadata: ModuleMetadata,
    artifact: Option<Artifact>,
    installed_at: Option<PathBuf>,
    source: Arc<dyn Source>,
    staging: tokio::sync::Mutex<Option<Staged>>,
}

impl Release {
    /// Build a release from module metadata.
    ///
    /// The version must parse; dependency requirements that don't parse are
    /// kept as empty ranges, which no release can satisfy.
    pub fn from_metadata(source: Arc<dyn Source>, metadata: ModuleMetadata) -> ModkitResult<Self> {
        let version = Version::parse(&metadata.version)?;
        let dependencies = metadata
            .dependency_requirements()
            .into_iter()
            .map(|(dep, requirement)| {
                let range = VersionRange::parse(&requirement).unwrap_or_else(|e| {
                    tracing::debug!(
                        "{} {version}: dependency on {dep} has an unusable requirement: {e}",
                        metadata.full_name()
                    );
                    VersionRange::empty()
                });
                (dep, range)
            })
            .collect();
        Ok(Self {
            name: metadata.full_name(),
            version,
            dependencies,
            metadata,
            artifact: None,
            installed_at: None,
            source,
            staging: tokio::sync::Mutex::new(None),
        })
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Mark this release as the copy already installed at `path`.
    pub fn with_installed_at(mut self, path: PathBuf) -> Self {
        self.installed_at = Some(path);
        self
    }

    /// A copy of this release with its dependency map cleared.
    pub fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            dependencies: BTreeMap::new(),
            metadata: self.metadata.clone(),
            artifact: self.artifact.clone(),
            installed_at: self.installed_at.clone(),
            source: Arc::clone(&self.source),
            staging: tokio::sync::Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn dependencies(&self) -> &BTreeMap<String, VersionRange> {
        &self.dependencies
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// The directory this release is installed in, for installed releases.
    pub fn installed_at(&self) -> Option<&Path> {
        self.installed_at.as_deref()
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn priority(&self) -> i32 {
        self.source.priority()
    }

    /// The directory name this release installs into.
    pub fn dir_name(&self) -> &str {
        name::module_dir_name(&self.name)
    }

    /// Stage this release, reusing an earlier staging if there is one.
    ///
    /// Returns the staged module root.
    pub async fn prepare(&self) -> ModkitResult<PathBuf> {
        let mut staging = self.staging.lock().await;
        if let Some(staged) = staging.as_ref() {
            return Ok(staged.root.clone());
        }
        tracing::debug!("staging {} {} from {}", self.name, self.version, self.source.label());
        let staged = self.source.stage(self).await?;
        let root = staged.root.clone();
        *staging = Some(staged);
        Ok(root)
    }

    /// Move the staged content to `parent/<dir name>`, replacing what is there.
    ///
    /// The staging directory is gone when this returns, whatever the outcome.
    pub async fn install(&self, parent: &Path) -> ModkitResult<PathBuf> {
        self.prepare().await?;
        let staged = self.staging.lock().await.take().ok_or_else(|| ModkitError::Generic {
            message: format!("{} {} was not staged", self.name, self.version),
        })?;
        let target = parent.join(self.dir_name());
        modkit_util::fs::replace_dir(&staged.root, &target).map_err(|e| ModkitError::Generic {
            message: format!(
                "failed to install {} {} into {}: {e}",
                self.name,
                self.version,
                target.display()
            ),
        })?;
        Ok(target)
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("name", &self.name)
            .field("version", &self.version.to_string())
            .field("source", &self.source.label())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority()
            .cmp(&other.priority())
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.source.label().cmp(&other.source.label()))
    }
}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Release {}
