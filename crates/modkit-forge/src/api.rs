//! Wire types of the v3 registry API.

use serde::Deserialize;

use modkit_core::metadata::ModuleMetadata;

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub pagination: Pagination,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// Path of the next page, or `None` on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// A release as listed by `/v3/releases`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseData {
    pub metadata: ModuleMetadata,
    pub file_uri: String,
    #[serde(default)]
    pub file_md5: Option<String>,
}

/// A module as listed by `/v3/modules`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleData {
    pub name: String,
    pub owner: Owner,
    #[serde(default)]
    pub homepage_url: Option<String>,
    pub current_release: CurrentRelease,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentRelease {
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Option<CurrentMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentMetadata {
    #[serde(default)]
    pub summary: Option<String>,
}

/// A search hit, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchResult {
    pub full_name: String,
    pub author: String,
    pub name: String,
    pub version: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub project_url: Option<String>,
}

impl From<ModuleData> for SearchResult {
    fn from(data: ModuleData) -> Self {
        let summary = data
            .current_release
            .metadata
            .and_then(|m| m.summary)
            .unwrap_or_default();
        Self {
            full_name: format!("{}-{}", data.owner.username, data.name),
            author: data.owner.username,
            name: data.name,
            version: data.current_release.version,
            summary,
            tags: data.current_release.tags,
            project_url: data.homepage_url,
        }
    }
}
