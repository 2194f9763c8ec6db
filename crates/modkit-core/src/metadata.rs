use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use modkit_util::errors::ModkitError;

use crate::name;

/// Requirement string used when a dependency does not declare one.
pub const ANY_VERSION: &str = ">= 0.0.0";

/// Parsed `metadata.json` of a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_page: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Requirement>,
}

/// A dependency entry: another module and the versions this one accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    #[serde(
        default,
        alias = "versionRequirement",
        skip_serializing_if = "Option::is_none"
    )]
    pub version_requirement: Option<String>,
}

/// A requirement on the host platform, e.g. `{"name": "pe", "version_requirement": ">= 3.0.0"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(
        default,
        alias = "versionRequirement",
        skip_serializing_if = "Option::is_none"
    )]
    pub version_requirement: Option<String>,
}

impl ModuleMetadata {
    /// Parse metadata from a JSON string.
    pub fn from_json(content: &str) -> miette::Result<Self> {
        let metadata: Self = serde_json::from_str(content).map_err(|e| ModkitError::Metadata {
            message: format!("invalid metadata.json: {e}"),
        })?;
        if metadata.name.is_empty() {
            return Err(ModkitError::Metadata {
                message: "metadata.json has no module name".to_string(),
            }
            .into());
        }
        Ok(metadata)
    }

    /// Read `metadata.json` from the root of a module directory.
    pub fn from_dir(dir: &Path) -> miette::Result<Self> {
        let path = dir.join(crate::METADATA_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| ModkitError::Metadata {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json(&content)
    }

    /// The normalized author-qualified name (`author-module`).
    pub fn full_name(&self) -> String {
        name::normalize(&self.name)
    }

    /// Declared dependencies as `normalized name -> requirement string`.
    ///
    /// A dependency without a requirement accepts any version. When a name is
    /// listed more than once, the last entry wins.
    pub fn dependency_requirements(&self) -> BTreeMap<String, String> {
        self.dependencies
            .iter()
            .map(|dep| {
                let requirement = dep
                    .version_requirement
                    .clone()
                    .unwrap_or_else(|| ANY_VERSION.to_string());
                (name::normalize(&dep.name), requirement)
            })
            .collect()
    }

    /// The requirement this module declares on the named host platform, if any.
    pub fn host_requirement(&self, host: &str) -> Option<&str> {
        self.requirements
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(host))
            .and_then(|r| r.version_requirement.as_deref())
    }
}

/// Load a module's `checksums.json` (relative path -> MD5 hex digest).
///
/// Returns `Ok(None)` when the module ships no checksums.
pub fn load_checksums(dir: &Path) -> miette::Result<Option<BTreeMap<String, String>>> {
    let path = dir.join(crate::CHECKSUMS_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(ModkitError::from)?;
    let checksums = serde_json::from_str(&content).map_err(|e| ModkitError::Metadata {
        message: format!("invalid {}: {e}", path.display()),
    })?;
    Ok(Some(checksums))
}
