#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use async_trait::async_trait;
use miette::IntoDiagnostic;
use modkit_core::metadata::{DependencySpec, ModuleMetadata, Requirement};
use modkit_ops::ops_install::InstallOptions;
use modkit_ops::ops_upgrade::UpgradeOptions;
use modkit_resolver::release::PRIORITY_REGISTRY;
use modkit_resolver::{Release, Source, Staged};
use modkit_util::errors::ModkitResult;
use tempfile::TempDir;

pub fn meta(name: &str, version: &str, deps: &[(&str, &str)]) -> ModuleMetadata {
    ModuleMetadata {
        name: name.to_string(),
        version: version.to_string(),
        dependencies: deps
            .iter()
            .map(|(dep, req)| DependencySpec {
                name: dep.to_string(),
                version_requirement: Some(req.to_string()),
            })
            .collect(),
        ..Default::default()
    }
}

pub fn with_requirement(mut metadata: ModuleMetadata, host: &str, req: &str) -> ModuleMetadata {
    metadata.requirements.push(Requirement {
        name: host.to_string(),
        version_requirement: Some(req.to_string()),
    });
    metadata
}

/// A registry stand-in whose staged releases are real directories holding
/// `metadata.json` and one manifest.
pub struct StubRegistry {
    modules: BTreeMap<String, Vec<ModuleMetadata>>,
    /// Modules staged without content, so that installing them fails.
    unusable: BTreeSet<String>,
    staging: Option<PathBuf>,
    fetches: AtomicUsize,
    stages: AtomicUsize,
}

impl StubRegistry {
    pub fn new(releases: Vec<ModuleMetadata>) -> Arc<Self> {
        Arc::new(Self::build(releases, &[], None))
    }

    /// Stages under `staging`; the modules in `unusable` stage to a root that
    /// does not exist.
    pub fn with_unusable(releases: Vec<ModuleMetadata>, unusable: &[&str], staging: &Path) -> Arc<Self> {
        Arc::new(Self::build(releases, unusable, Some(staging.to_path_buf())))
    }

    fn build(releases: Vec<ModuleMetadata>, unusable: &[&str], staging: Option<PathBuf>) -> Self {
        let mut modules: BTreeMap<String, Vec<ModuleMetadata>> = BTreeMap::new();
        for m in releases {
            modules.entry(m.full_name()).or_default().push(m);
        }
        Self {
            modules,
            unusable: unusable.iter().map(|n| n.to_string()).collect(),
            staging,
            fetches: AtomicUsize::new(0),
            stages: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for StubRegistry {
    fn label(&self) -> String {
        "https://forge.test".to_string()
    }

    fn priority(&self) -> i32 {
        PRIORITY_REGISTRY
    }

    async fn fetch(self: Arc<Self>, name: String) -> ModkitResult<Vec<Release>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let source: Arc<dyn Source> = self.clone();
        self.modules
            .get(&name)
            .into_iter()
            .flatten()
            .map(|m| Release::from_metadata(Arc::clone(&source), m.clone()))
            .collect()
    }

    async fn stage(&self, release: &Release) -> ModkitResult<Staged> {
        self.stages.fetch_add(1, Ordering::SeqCst);
        let dir = match &self.staging {
            Some(staging) => {
                std::fs::create_dir_all(staging).into_diagnostic()?;
                tempfile::tempdir_in(staging).into_diagnostic()?
            }
            None => tempfile::tempdir().into_diagnostic()?,
        };
        let root = dir.path().join(format!("{}-{}", release.name(), release.version()));
        if self.unusable.contains(release.name()) {
            return Ok(Staged { dir, root });
        }
        std::fs::create_dir_all(root.join("manifests")).into_diagnostic()?;
        let json = serde_json::to_string_pretty(release.metadata()).into_diagnostic()?;
        std::fs::write(root.join("metadata.json"), json).into_diagnostic()?;
        std::fs::write(root.join("manifests").join("init.pp"), "class init {}").into_diagnostic()?;
        Ok(Staged { dir, root })
    }
}

/// A scratch layout: `modules/` as the install target, `var/` as working dir.
pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn modules(&self) -> PathBuf {
        self.tmp.path().join("modules")
    }

    pub fn var(&self) -> PathBuf {
        self.tmp.path().join("var")
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            target_dir: self.modules(),
            modulepath: vec![self.modules()],
            working_dir: self.var(),
            ..Default::default()
        }
    }

    pub fn upgrade_options(&self) -> UpgradeOptions {
        UpgradeOptions {
            modulepath: vec![self.modules()],
            working_dir: self.var(),
            ..Default::default()
        }
    }

    /// Put a module on disk as if it had been installed earlier.
    pub fn preinstall(&self, metadata: &ModuleMetadata) -> PathBuf {
        preinstall_into(&self.modules(), metadata)
    }

    /// Version recorded in the installed `metadata.json` of directory `dir`.
    pub fn installed_version(&self, dir: &str) -> Option<String> {
        let text = std::fs::read_to_string(self.modules().join(dir).join("metadata.json")).ok()?;
        let metadata: ModuleMetadata = serde_json::from_str(&text).ok()?;
        Some(metadata.version)
    }
}

pub fn preinstall_into(modulepath: &Path, metadata: &ModuleMetadata) -> PathBuf {
    let dir_name = metadata
        .name
        .split(['-', '/'])
        .skip(1)
        .collect::<Vec<_>>()
        .join("-");
    let dir = modulepath.join(dir_name);
    std::fs::create_dir_all(dir.join("manifests")).unwrap();
    std::fs::write(
        dir.join("metadata.json"),
        serde_json::to_string_pretty(metadata).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.join("manifests").join("init.pp"), "class init {}").unwrap();
    dir
}

/// Record checksums for the installed manifest, then change it.
pub fn modify_locally(module_dir: &Path) {
    let digest = modkit_util::hash::md5_bytes(b"class init {}");
    std::fs::write(
        module_dir.join("checksums.json"),
        format!(r#"{{"manifests/init.pp": "{digest}"}}"#),
    )
    .unwrap();
    std::fs::write(module_dir.join("manifests").join("init.pp"), "class init { notify { 'x': } }").unwrap();
}

pub fn write_tarball(path: &Path, top: &str, metadata: &ModuleMetadata) {
    let json = serde_json::to_string(metadata).unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in [
        (format!("{top}/metadata.json"), json.as_str()),
        (format!("{top}/manifests/init.pp"), "class init {}"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}
