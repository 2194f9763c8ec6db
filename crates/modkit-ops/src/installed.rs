//! Index of the modules already installed on the modulepath, usable as a
//! release [`Source`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use modkit_core::metadata::{self, ModuleMetadata};
use modkit_core::name;
use modkit_resolver::release::PRIORITY_INSTALLED;
use modkit_resolver::{Release, Source, Staged, Version};
use modkit_util::errors::{ModkitError, ModkitResult};
use modkit_util::hash;

/// One module directory found on the modulepath.
#[derive(Debug, Clone)]
pub struct InstalledModule {
    /// Directory name, i.e. the unqualified module name.
    pub dir_name: String,
    /// The module directory itself.
    pub path: PathBuf,
    /// The modulepath entry containing `path`.
    pub modulepath: PathBuf,
    /// `None` when the directory has no readable `metadata.json`.
    pub metadata: Option<ModuleMetadata>,
    /// `None` when there is no metadata or its version does not parse.
    pub version: Option<Version>,
}

impl InstalledModule {
    fn load(path: &Path, modulepath: &Path) -> Option<Self> {
        let dir_name = path.file_name()?.to_str()?.to_string();
        let metadata = match ModuleMetadata::from_dir(path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                if path.join(modkit_core::METADATA_FILE).exists() {
                    tracing::warn!("{}: {e}", path.display());
                }
                None
            }
        };
        let version = metadata.as_ref().and_then(|m| match Version::parse(&m.version) {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!("{}: {e}", path.display());
                None
            }
        });
        Some(Self {
            dir_name,
            path: path.to_path_buf(),
            modulepath: modulepath.to_path_buf(),
            metadata,
            version,
        })
    }

    /// Normalized author-qualified name from the metadata.
    pub fn full_name(&self) -> Option<String> {
        self.metadata.as_ref().map(ModuleMetadata::full_name)
    }

    /// Files listed in `checksums.json` that are missing or have changed.
    ///
    /// Modules without a checksum list report no changes.
    pub fn local_changes(&self) -> Vec<String> {
        let checksums = match metadata::load_checksums(&self.path) {
            Ok(Some(checksums)) => checksums,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("{}: {e}", self.path.display());
                return Vec::new();
            }
        };
        checksums
            .into_iter()
            .filter(|(file, expected)| {
                match hash::md5_file(&self.path.join(file)) {
                    Ok(actual) => !actual.eq_ignore_ascii_case(expected),
                    Err(_) => true,
                }
            })
            .map(|(file, _)| file)
            .collect()
    }
}

/// The modules installed across a modulepath.
///
/// When the same module appears under several modulepath entries, the
/// first entry wins.
pub struct InstalledModules {
    by_name: BTreeMap<String, InstalledModule>,
    by_dir: BTreeMap<String, InstalledModule>,
    fetched: Mutex<BTreeSet<String>>,
}

impl InstalledModules {
    /// Scan every directory on `modulepath`. Missing entries are skipped.
    pub fn scan(modulepath: &[PathBuf]) -> Self {
        let mut by_name = BTreeMap::new();
        let mut by_dir = BTreeMap::new();
        for root in modulepath {
            let Ok(entries) = std::fs::read_dir(root) else {
                tracing::debug!("modulepath entry {} is not readable", root.display());
                continue;
            };
            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| !n.starts_with('.'))
                })
                .collect();
            dirs.sort();

            for dir in dirs {
                let Some(module) = InstalledModule::load(&dir, root) else {
                    continue;
                };
                if let (Some(full_name), Some(_)) = (module.full_name(), &module.version) {
                    by_name.entry(full_name).or_insert_with(|| module.clone());
                }
                by_dir.entry(module.dir_name.clone()).or_insert(module);
            }
        }
        tracing::debug!("found {} installed module(s)", by_name.len());
        Self {
            by_name,
            by_dir,
            fetched: Mutex::new(BTreeSet::new()),
        }
    }

    /// Installed module by normalized full name.
    pub fn get(&self, full_name: &str) -> Option<&InstalledModule> {
        self.by_name.get(full_name)
    }

    /// Installed module occupying directory `dir_name`, with or without metadata.
    pub fn by_dir(&self, dir_name: &str) -> Option<&InstalledModule> {
        self.by_dir.get(dir_name)
    }

    /// Installed modules with usable metadata, by full name.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &InstalledModule)> {
        self.by_name.iter().map(|(name, module)| (name.as_str(), module))
    }

    /// Installed modules that have been looked up as a source so far.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn release_for(self: &Arc<Self>, full_name: &str) -> ModkitResult<Option<Release>> {
        let Some(module) = self.by_name.get(full_name) else {
            return Ok(None);
        };
        let Some(metadata) = module.metadata.clone() else {
            return Ok(None);
        };
        let source: Arc<dyn Source> = Arc::clone(self) as Arc<dyn Source>;
        let release = Release::from_metadata(source, metadata)?.with_installed_at(module.path.clone());
        Ok(Some(release))
    }
}

#[async_trait]
impl Source for InstalledModules {
    fn label(&self) -> String {
        "installed modules".to_string()
    }

    fn priority(&self) -> i32 {
        PRIORITY_INSTALLED
    }

    async fn fetch(self: Arc<Self>, name: String) -> ModkitResult<Vec<Release>> {
        let name = name::normalize(&name);
        let release = self.release_for(&name)?;
        if release.is_some() {
            self.fetched
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name);
        }
        Ok(release.into_iter().collect())
    }

    async fn stage(&self, release: &Release) -> ModkitResult<Staged> {
        Err(ModkitError::Generic {
            message: format!("{release} is already installed and cannot be staged"),
        }
        .into())
    }
}
