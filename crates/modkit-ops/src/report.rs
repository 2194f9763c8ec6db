//! The structured result of an install or upgrade, and its renderings.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::{v, ModuleToolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Upgrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Noop,
    Failure,
}

/// What happened to one node of the install graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAction {
    Install,
    Upgrade,
}

/// A module that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// One node of the tree describing what was installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallNode {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// The modulepath entry the module lives in.
    pub path: PathBuf,
    pub action: NodeAction,
    pub dependencies: Vec<InstallNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub oneline: String,
    pub multiline: String,
}

impl From<&ModuleToolError> for ErrorReport {
    fn from(err: &ModuleToolError) -> Self {
        Self {
            oneline: err.oneline(),
            multiline: err.multiline(),
        }
    }
}

/// Result record of one install or upgrade invocation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub action: Action,
    pub result: Outcome,
    pub name: String,
    /// The requested version or range, `latest` when none was given.
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_modules: Option<Vec<ModuleSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_modules: Option<Vec<ModuleSummary>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub graph: Vec<InstallNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl OperationReport {
    pub fn new(action: Action, name: &str, version: &str) -> Self {
        Self {
            action,
            result: Outcome::Failure,
            name: name.to_string(),
            version: version.to_string(),
            installed_version: None,
            install_dir: None,
            installed_modules: None,
            affected_modules: None,
            graph: Vec::new(),
            error: None,
        }
    }

    /// Record `err` and mark the operation failed.
    pub fn fail(mut self, err: &ModuleToolError) -> Self {
        tracing::debug!("{} of {} failed: {err}", self.action_verb(), self.name);
        if let ModuleToolError::PartialInstall { installed, .. } = err {
            match self.action {
                Action::Install => self.installed_modules = Some(installed.clone()),
                Action::Upgrade => self.affected_modules = Some(installed.clone()),
            }
        }
        self.result = Outcome::Failure;
        self.error = Some(ErrorReport::from(err));
        self
    }

    pub fn is_success(&self) -> bool {
        self.result != Outcome::Failure
    }

    fn action_verb(&self) -> &'static str {
        match self.action {
            Action::Install => "install",
            Action::Upgrade => "upgrade",
        }
    }

    pub fn to_json(&self) -> miette::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| miette::miette!("could not render report: {e}"))
    }

    /// Human readable rendering: the install directory and tree on success,
    /// the explanation otherwise.
    pub fn render_human(&self) -> String {
        match self.result {
            Outcome::Success => {
                let dir = self.install_dir.as_deref().unwrap_or(Path::new("."));
                let mut out = format!("{}\n", dir.display());
                out.push_str(&format_tree(&self.graph, dir));
                out
            }
            Outcome::Noop => match (&self.error, self.action) {
                (Some(error), _) => error.multiline.clone(),
                (None, Action::Install) => format!(
                    "Module {} {} is already installed.",
                    self.name,
                    self.installed_version.as_deref().map(v).unwrap_or_default()
                ),
                (None, Action::Upgrade) => format!("Module {} is already up to date.", self.name),
            },
            Outcome::Failure => self
                .error
                .as_ref()
                .map(|e| e.multiline.clone())
                .unwrap_or_else(|| format!("Could not {} '{}'", self.action_verb(), self.name)),
        }
    }
}

/// Render nodes as a box-drawing tree. Paths equal to `base` are omitted.
pub fn format_tree(nodes: &[InstallNode], base: &Path) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes, "", base);
    out
}

fn write_nodes(out: &mut String, nodes: &[InstallNode], indent: &str, base: &Path) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { '└' } else { '├' };
        let fork = if node.dependencies.is_empty() { '─' } else { '┬' };
        let _ = writeln!(out, "{indent}{branch}─{fork} {}", node_text(node, base));

        let child_indent = format!("{indent}{} ", if last { ' ' } else { '│' });
        write_nodes(out, &node.dependencies, &child_indent, base);
    }
}

fn node_text(node: &InstallNode, base: &Path) -> String {
    let mut text = match &node.previous_version {
        Some(previous) if node.action == NodeAction::Upgrade => {
            format!("{} ({} -> {})", node.name, v(previous), v(&node.version))
        }
        _ => format!("{} ({})", node.name, v(&node.version)),
    };
    if node.path != base {
        let _ = write!(text, " [{}]", node.path.display());
    }
    text
}
