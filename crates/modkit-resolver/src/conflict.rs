//! Unsatisfiable-resolution diagnostics.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Resolution found no consistent selection.
///
/// `name` is the module whose candidates ran out furthest into the search,
/// which is usually the closest to the actual cause.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("No version of '{name}' satisfies all dependencies")]
#[diagnostic(help("Use --ignore-dependencies or --force to install anyway"))]
pub struct Unsatisfiable {
    pub name: String,
    /// Every restriction that applied to `name` at the point of failure.
    pub constraints: Vec<String>,
    pub rejections: Vec<Rejection>,
}

/// Why one candidate was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub release: String,
    pub reason: String,
}

impl Unsatisfiable {
    /// Multi-line explanation listing constraints and rejected candidates.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        if self.rejections.is_empty() {
            out.push_str(&format!("  No candidates found for '{}'\n", self.name));
        }
        for constraint in &self.constraints {
            out.push_str(&format!("  '{}' {}\n", self.name, constraint));
        }
        for rejection in &self.rejections {
            out.push_str(&format!("    {rejection}\n"));
        }
        out
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rejected: {}", self.release, self.reason)
    }
}
