//! The registry as a release [`Source`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use modkit_core::config::HostConfig;
use modkit_resolver::release::PRIORITY_REGISTRY;
use modkit_resolver::{Artifact, Release, Source, Staged, Version, VersionRange};
use modkit_util::errors::{ModkitError, ModkitResult};

use crate::api::ReleaseData;
use crate::archive;
use crate::cache::WorkingDir;
use crate::checksum;
use crate::client::ForgeClient;

/// Releases published on a registry.
pub struct ForgeSource {
    client: ForgeClient,
    working_dir: WorkingDir,
    host: Option<HostConfig>,
    fetched: Mutex<BTreeMap<String, Vec<ReleaseData>>>,
}

impl ForgeSource {
    pub fn new(client: ForgeClient, working_dir: WorkingDir, host: Option<HostConfig>) -> Self {
        Self {
            client,
            working_dir,
            host,
            fetched: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn client(&self) -> &ForgeClient {
        &self.client
    }

    async fn release_data(&self, name: &str) -> ModkitResult<Vec<ReleaseData>> {
        if let Some(data) = self.fetched.lock().await.get(name) {
            return Ok(data.clone());
        }
        let data = self.client.fetch_releases(name).await?;
        self.fetched
            .lock()
            .await
            .insert(name.to_string(), data.clone());
        Ok(data)
    }
}

#[async_trait]
impl Source for ForgeSource {
    fn label(&self) -> String {
        self.client.repository().url.clone()
    }

    fn priority(&self) -> i32 {
        PRIORITY_REGISTRY
    }

    async fn fetch(self: Arc<Self>, name: String) -> ModkitResult<Vec<Release>> {
        let data = self.release_data(&name).await?;
        let source: Arc<dyn Source> = self.clone();
        let mut releases = Vec::with_capacity(data.len());
        for item in data {
            let version = item.metadata.version.clone();
            match Release::from_metadata(Arc::clone(&source), item.metadata) {
                Ok(release) => releases.push(release.with_artifact(Artifact {
                    uri: item.file_uri,
                    checksum: item.file_md5,
                })),
                Err(e) => tracing::warn!("ignoring release {name} {version}: {e}"),
            }
        }
        Ok(prefer_supported(releases, self.host.as_ref()))
    }

    async fn stage(&self, release: &Release) -> ModkitResult<Staged> {
        let artifact = release.artifact().ok_or_else(|| ModkitError::Generic {
            message: format!("{release} has no download location"),
        })?;
        let prefix = format!("{}-{}-", release.name(), release.version());

        let download = self.working_dir.download_file(&prefix)?;
        modkit_util::progress::status("Downloading", &release.to_string());
        self.client
            .download(&artifact.uri, download.path(), &release.to_string())
            .await?;
        match &artifact.checksum {
            Some(expected) => checksum::verify_md5(download.path(), expected, release.name())?,
            None => tracing::warn!("no checksum published for {release}"),
        }

        let dir = self.working_dir.staging(&prefix)?;
        let root = archive::unpack(download.path(), dir.path())?;
        Ok(Staged { dir, root })
    }
}

/// If any release declares a requirement on the host platform that the
/// running host satisfies, keep only such releases.
pub fn prefer_supported(releases: Vec<Release>, host: Option<&HostConfig>) -> Vec<Release> {
    let Some(host) = host else {
        return releases;
    };
    let Ok(host_version) = Version::parse(&host.version) else {
        tracing::debug!("host version '{}' is not a version; skipping requirement filter", host.version);
        return releases;
    };
    let supported = |release: &Release| {
        release
            .metadata()
            .host_requirement(&host.name)
            .is_some_and(|req| VersionRange::parse_or_empty(req).includes(&host_version))
    };
    if !releases.iter().any(supported) {
        return releases;
    }
    let (kept, dropped): (Vec<Release>, Vec<Release>) = releases.into_iter().partition(supported);
    if let Some(first) = kept.first() {
        tracing::debug!(
            "found supported release for {}; excluding {} unsupported release(s)",
            first.name(),
            dropped.len()
        );
    }
    kept
}
