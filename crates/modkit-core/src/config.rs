use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use modkit_util::errors::ModkitError;

/// Default registry base URL.
pub const DEFAULT_FORGE_URL: &str = "https://forgeapi.puppet.com";

/// Global user configuration loaded from `~/.modkit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub forge: ForgeConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    /// The host platform modules may declare requirements against.
    #[serde(default)]
    pub host: Option<HostConfig>,
}

/// Registry settings from `[forge]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default = "default_forge_url")]
    pub url: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            url: default_forge_url(),
        }
    }
}

fn default_forge_url() -> String {
    DEFAULT_FORGE_URL.to_string()
}

/// Filesystem locations from `[paths]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Install roots. The first entry is the default install target.
    #[serde(default = "default_modulepath")]
    pub modulepath: Vec<String>,
    /// Downloads and staging live here.
    #[serde(default = "default_working_dir", rename = "working-dir")]
    pub working_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            modulepath: default_modulepath(),
            working_dir: default_working_dir(),
        }
    }
}

fn default_modulepath() -> Vec<String> {
    vec!["~/.modkit/modules".to_string()]
}

fn default_working_dir() -> String {
    "~/.modkit/var".to_string()
}

/// The running host platform from `[host]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub version: String,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.modkit/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ModkitError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| {
            ModkitError::Config {
                message: format!("failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Install roots with `~` expanded.
    pub fn modulepath(&self) -> Vec<PathBuf> {
        self.paths.modulepath.iter().map(|p| expand_tilde(p)).collect()
    }

    /// Working directory with `~` expanded.
    pub fn working_dir(&self) -> PathBuf {
        expand_tilde(&self.paths.working_dir)
    }
}

/// Returns the path to the modkit data directory (`~/.modkit/`).
pub fn dirs_path() -> PathBuf {
    home_dir().join(".modkit")
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        home_dir()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}
