//! Registry API client.

use std::path::Path;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::api::{ModuleData, Page, ReleaseData, SearchResult};
use crate::download;
use crate::repository::ForgeRepository;

/// Talks to one registry over the v3 API.
#[derive(Debug, Clone)]
pub struct ForgeClient {
    client: Client,
    repository: ForgeRepository,
}

impl ForgeClient {
    pub fn new(url: &str) -> miette::Result<Self> {
        Ok(Self {
            client: download::build_client()?,
            repository: ForgeRepository::new(url),
        })
    }

    pub fn repository(&self) -> &ForgeRepository {
        &self.repository
    }

    /// Every published release of `name`, across all pages.
    pub async fn fetch_releases(&self, name: &str) -> miette::Result<Vec<ReleaseData>> {
        let first = self.repository.releases_url(name)?;
        self.collect_pages(first).await
    }

    /// Modules matching `term`, across all pages.
    pub async fn search(&self, term: &str) -> miette::Result<Vec<SearchResult>> {
        let first = self.repository.search_url(term)?;
        let modules: Vec<ModuleData> = self.collect_pages(first).await?;
        Ok(modules.into_iter().map(SearchResult::from).collect())
    }

    /// Download a release archive (`file_uri`) to `dest`.
    pub async fn download(&self, file_uri: &str, dest: &Path, label: &str) -> miette::Result<()> {
        let url = self.repository.resolve(file_uri)?;
        tracing::debug!("downloading {url}");
        download::download_to_file(&self.client, &url, dest, label).await
    }

    async fn collect_pages<T: DeserializeOwned>(&self, first: reqwest::Url) -> miette::Result<Vec<T>> {
        let mut results = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            tracing::debug!("GET {url}");
            let page: Page<T> = download::get_json(&self.client, &url).await?;
            results.extend(page.results);
            if let Some(path) = page.pagination.next {
                next = Some(self.repository.resolve(&path)?);
            }
        }
        Ok(results)
    }
}
