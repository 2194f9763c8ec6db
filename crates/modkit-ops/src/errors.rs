//! Typed failures of the install and upgrade operations.
//!
//! Every variant renders a one-line message through `Display` and a longer
//! explanation through [`ModuleToolError::multiline`]; both end up in the
//! operation report.

use std::path::PathBuf;

use thiserror::Error;

use modkit_resolver::Unsatisfiable;

use crate::report::ModuleSummary;

#[derive(Debug, Error)]
pub enum ModuleToolError {
    #[error("'{name}' ({requested}) requested; '{name}' ({}) already installed", v(.installed))]
    AlreadyInstalled {
        name: String,
        installed: String,
        requested: String,
        local_changes: Vec<String>,
    },

    #[error("Could not {action} '{name}' ({}); no version satisfies all dependencies", vstring(.installed.as_deref(), .requested))]
    NoVersionsSatisfy {
        action: &'static str,
        name: String,
        requested: String,
        installed: Option<String>,
        #[source]
        conflict: Unsatisfiable,
        /// Other installed modules whose pins may be blocking the request.
        culprits: Vec<String>,
    },

    #[error("'{name}' ({requested}) requested; installation conflict")]
    InstallConflict {
        name: String,
        requested: String,
        /// `(name, version)` of the dependency that collides, when it is not the requested module.
        dependency: Option<(String, String)>,
        directory: PathBuf,
        /// `(name, version)` of what occupies the directory, if it has metadata.
        occupant: Option<(String, String)>,
    },

    #[error("Could not upgrade '{name}'; module is not installed")]
    NotInstalled { name: String },

    #[error("Could not {action} '{name}'; module has had changes made locally")]
    LocalChanges {
        action: &'static str,
        name: String,
        requested: String,
        installed: String,
        changes: Vec<String>,
    },

    #[error("Could not upgrade '{name}'; no releases {}available from {registry}", matching(.requested))]
    NoCandidateReleases {
        name: String,
        requested: String,
        installed: String,
        /// Label of the registry that was asked.
        registry: String,
    },

    #[error("Could not upgrade '{name}'; more recent versions not found")]
    VersionAlreadyInstalled {
        name: String,
        requested: String,
        installed: String,
        /// Versions newer than the installed one that could not be selected.
        newer: Vec<String>,
        /// Other installed modules whose pins may be holding the upgrade back.
        culprits: Vec<String>,
    },

    #[error("Could not {action} '{name}'; {message}")]
    InvalidModule {
        action: &'static str,
        name: String,
        message: String,
    },

    #[error("Could not {action} '{name}'; installation stopped at '{failed}': {message}")]
    PartialInstall {
        action: &'static str,
        name: String,
        /// Modules written before the failure.
        installed: Vec<ModuleSummary>,
        failed: String,
        message: String,
    },

    #[error("{message}")]
    Failed { message: String },
}

impl ModuleToolError {
    /// The one-line message.
    pub fn oneline(&self) -> String {
        self.to_string()
    }

    /// A multi-line explanation with suggestions.
    pub fn multiline(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self {
            ModuleToolError::AlreadyInstalled {
                name,
                installed,
                requested,
                local_changes,
            } => {
                lines.push(format!("Could not install module '{name}' ({requested})"));
                lines.push(format!("  Module '{name}' ({}) is already installed", v(installed)));
                if !local_changes.is_empty() {
                    lines.push("    Installed module has had changes made locally".to_string());
                }
                lines.push("    Use `modkit upgrade` to install a different version".to_string());
                lines.push("    Use `modkit install --force` to re-install only this module".to_string());
            }
            ModuleToolError::NoVersionsSatisfy {
                action,
                name,
                requested,
                installed,
                conflict,
                culprits,
            } => {
                lines.push(format!(
                    "Could not {action} module '{name}' ({})",
                    vstring(installed.as_deref(), requested)
                ));
                lines.push(format!("  No version of '{}' can satisfy all dependencies", conflict.name));
                for line in conflict.explain().lines() {
                    lines.push(format!("  {line}"));
                }
                if !culprits.is_empty() {
                    lines.push("    Dependencies will not be automatically upgraded across major versions".to_string());
                    lines.push("    Upgrading one or more of these modules may permit the upgrade to succeed:".to_string());
                    for culprit in culprits {
                        lines.push(format!("    - {culprit}"));
                    }
                }
                lines.push(format!(
                    "    Use `modkit {action} --ignore-dependencies` to {action} only this module"
                ));
            }
            ModuleToolError::InstallConflict {
                name,
                requested,
                dependency,
                directory,
                occupant,
            } => {
                lines.push(format!("Could not install module '{name}' ({requested})"));
                match dependency {
                    Some((dep_name, dep_version)) => lines.push(format!(
                        "  Dependency '{dep_name}' ({}) would overwrite {}",
                        v(dep_version),
                        directory.display()
                    )),
                    None => lines.push(format!("  Installation would overwrite {}", directory.display())),
                }
                if let Some((occupant_name, occupant_version)) = occupant {
                    lines.push(format!(
                        "    Currently, '{occupant_name}' ({}) is installed to that directory",
                        v(occupant_version)
                    ));
                }
                if dependency.is_some() {
                    lines.push("    Use `modkit install --ignore-dependencies` to install only this module".to_string());
                } else {
                    lines.push("    Use `modkit install --target-dir <DIR>` to install modules elsewhere".to_string());
                }
                lines.push("    Use `modkit install --force` to install this module anyway".to_string());
            }
            ModuleToolError::NotInstalled { name } => {
                lines.push(format!("Could not upgrade module '{name}'"));
                lines.push(format!("  Module '{name}' is not installed"));
                lines.push("    Use `modkit install` to install this module".to_string());
            }
            ModuleToolError::LocalChanges {
                action,
                name,
                requested,
                installed,
                changes,
            } => {
                lines.push(format!(
                    "Could not {action} module '{name}' ({})",
                    vstring(Some(installed), requested)
                ));
                lines.push("  Installed module has had changes made locally".to_string());
                for change in changes {
                    lines.push(format!("    - {change}"));
                }
                lines.push(format!("    Use `modkit {action} --force` to {action} this module anyway"));
            }
            ModuleToolError::NoCandidateReleases {
                name,
                requested,
                installed,
                registry,
            } => {
                lines.push(format!(
                    "Could not upgrade module '{name}' ({})",
                    vstring(Some(installed), requested)
                ));
                lines.push(format!("  No releases {}available from {registry}", matching(requested)));
                if requested == "latest" {
                    lines.push(format!("    Does '{name}' have at least one published release?"));
                }
            }
            ModuleToolError::VersionAlreadyInstalled {
                name,
                requested,
                installed,
                newer,
                culprits,
            } => {
                lines.push(format!(
                    "Could not upgrade module '{name}' ({})",
                    vstring(Some(installed), requested)
                ));
                if newer.is_empty() {
                    lines.push(format!(
                        "  The installed version is already the latest version matching {requested}"
                    ));
                } else {
                    lines.push(format!("  There are {} newer versions", newer.len()));
                    lines.push("    No combination of dependency upgrades would satisfy all dependencies".to_string());
                    if !culprits.is_empty() {
                        lines.push("    Dependencies will not be automatically upgraded across major versions".to_string());
                        lines.push("    Upgrading one or more of these modules may permit the upgrade to succeed:".to_string());
                        for culprit in culprits {
                            lines.push(format!("    - {culprit}"));
                        }
                    }
                }
                lines.push("    Use `modkit upgrade --force` to upgrade only this module".to_string());
            }
            ModuleToolError::InvalidModule { action, name, message } => {
                lines.push(format!("Could not {action} module '{name}'"));
                lines.push(format!("  {message}"));
            }
            ModuleToolError::PartialInstall {
                action,
                name,
                installed,
                failed,
                message,
            } => {
                lines.push(format!("Could not {action} module '{name}'"));
                lines.push(format!("  Installation stopped while installing '{failed}': {message}"));
                if installed.is_empty() {
                    lines.push("    No modules were changed".to_string());
                } else {
                    lines.push("    These modules were already installed before the failure:".to_string());
                    for module in installed {
                        lines.push(format!("    - {} ({})", module.name, module.version));
                    }
                }
            }
            ModuleToolError::Failed { message } => lines.push(message.clone()),
        }
        lines.join("\n")
    }
}

impl From<miette::Report> for ModuleToolError {
    fn from(report: miette::Report) -> Self {
        ModuleToolError::Failed {
            message: report.to_string(),
        }
    }
}

/// `1.2.3` becomes `v1.2.3`; anything not starting with a digit is kept.
pub(crate) fn v(version: &str) -> String {
    if version.starts_with(|c: char| c.is_ascii_digit()) {
        format!("v{version}")
    } else {
        version.to_string()
    }
}

/// `v1.0.0 -> latest` for upgrades, the bare request otherwise.
pub(crate) fn vstring(installed: Option<&str>, requested: &str) -> String {
    match installed {
        Some(installed) => format!("{} -> {}", v(installed), v(requested)),
        None => v(requested),
    }
}

fn matching(requested: &str) -> String {
    if requested == "latest" {
        "are ".to_string()
    } else {
        format!("matching '{requested}' are ")
    }
}
