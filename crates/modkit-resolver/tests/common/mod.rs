#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use miette::IntoDiagnostic;
use modkit_core::metadata::{DependencySpec, ModuleMetadata};
use modkit_resolver::{Release, Source, Staged};
use modkit_util::errors::ModkitResult;

/// Module metadata with the given dependencies (`name`, `requirement`).
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

/// An in-memory source whose staged releases contain only `metadata.json`.
pub struct MemorySource {
    pub label: String,
    pub priority: i32,
    pub modules: BTreeMap<String, Vec<ModuleMetadata>>,
    pub broken: bool,
    pub fetches: AtomicUsize,
    pub stages: AtomicUsize,
}

impl MemorySource {
    pub fn new(label: &str, priority: i32, releases: Vec<ModuleMetadata>) -> Arc<Self> {
        let mut modules: BTreeMap<String, Vec<ModuleMetadata>> = BTreeMap::new();
        for m in releases {
            modules.entry(m.full_name()).or_default().push(m);
        }
        Arc::new(Self {
            label: label.to_string(),
            priority,
            modules,
            broken: false,
            fetches: AtomicUsize::new(0),
            stages: AtomicUsize::new(0),
        })
    }

    pub fn broken(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            priority: 50,
            modules: BTreeMap::new(),
            broken: true,
            fetches: AtomicUsize::new(0),
            stages: AtomicUsize::new(0),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MemorySource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch(self: Arc<Self>, name: String) -> ModkitResult<Vec<Release>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(miette::miette!("{} is unreachable", self.label));
        }
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
        let dir = tempfile::tempdir().into_diagnostic()?;
        let root = dir.path().join(format!("{}-{}", release.name(), release.version()));
        std::fs::create_dir(&root).into_diagnostic()?;
        let json = serde_json::to_string_pretty(release.metadata()).into_diagnostic()?;
        std::fs::write(root.join("metadata.json"), json).into_diagnostic()?;
        Ok(Staged { dir, root })
    }
}

pub fn sources(list: &[Arc<MemorySource>]) -> Vec<Arc<dyn Source>> {
    list.iter()
        .map(|s| {
            let source: Arc<dyn Source> = s.clone();
            source
        })
        .collect()
}
