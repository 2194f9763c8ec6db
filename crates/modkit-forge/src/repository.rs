//! Registry URL layout.

use reqwest::Url;

use modkit_util::errors::ModkitError;

/// A module registry speaking the v3 API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeRepository {
    pub url: String,
}

impl ForgeRepository {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// First page of the releases of a module.
    pub fn releases_url(&self, name: &str) -> miette::Result<Url> {
        self.with_query("/v3/releases", &[("module", name)])
    }

    /// First page of a module search.
    pub fn search_url(&self, term: &str) -> miette::Result<Url> {
        self.with_query("/v3/modules", &[("query", term)])
    }

    /// Resolve a path returned by the API (`pagination.next`, `file_uri`)
    /// against the registry host. Absolute URLs are returned unchanged.
    pub fn resolve(&self, path: &str) -> miette::Result<Url> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.url, path.trim_start_matches('/'))
        };
        Url::parse(&url).map_err(|e| {
            ModkitError::Network {
                message: format!("invalid registry URL '{url}': {e}"),
            }
            .into()
        })
    }

    fn with_query(&self, path: &str, params: &[(&str, &str)]) -> miette::Result<Url> {
        let base = format!("{}{path}", self.url);
        Url::parse_with_params(&base, params).map_err(|e| {
            ModkitError::Network {
                message: format!("invalid registry URL '{base}': {e}"),
            }
            .into()
        })
    }
}
