//! Backtracking search for one release per module name.
//!
//! Names are resolved depth-first: the root names first (in name order), then
//! the dependencies of each chosen release before its siblings, so a failure
//! surfaces next to the release that introduced it. Candidates are tried in
//! the graph's preference order. When a name runs out of candidates the most
//! recent choice is undone and its next candidate is tried.

use std::collections::BTreeMap;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::conflict::{Rejection, Unsatisfiable};
use crate::graph::ConstraintGraph;
use crate::release::Release;

/// A consistent choice of one release per module name.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    releases: BTreeMap<String, Arc<Release>>,
}

impl Selection {
    pub fn get(&self, name: &str) -> Option<&Arc<Release>> {
        self.releases.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.releases.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Releases in name order.
    pub fn releases(&self) -> impl Iterator<Item = &Arc<Release>> {
        self.releases.values()
    }

    /// Releases ordered so that every release comes after the releases it
    /// depends on. Falls back to name order if the dependencies form a cycle.
    pub fn dependency_order(&self) -> Vec<Arc<Release>> {
        let mut graph: DiGraph<&Arc<Release>, ()> = DiGraph::new();
        let index: BTreeMap<&str, NodeIndex> = self
            .releases
            .iter()
            .map(|(name, release)| (name.as_str(), graph.add_node(release)))
            .collect();
        for (name, release) in &self.releases {
            for dep in release.dependencies().keys() {
                if let Some(&dep_idx) = index.get(dep.as_str()) {
                    graph.add_edge(dep_idx, index[name.as_str()], ());
                }
            }
        }
        match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|idx| Arc::clone(graph[idx])).collect(),
            Err(cycle) => {
                tracing::debug!(
                    "dependency cycle through {}, using name order",
                    graph[cycle.node_id()].name()
                );
                self.releases.values().cloned().collect()
            }
        }
    }
}

/// Resolve `graph` into a [`Selection`], or explain why none exists.
pub fn resolve(graph: &ConstraintGraph) -> Result<Selection, Unsatisfiable> {
    let mut search = Search {
        graph,
        selection: BTreeMap::new(),
        failure: None,
    };
    let mut pending: Vec<String> = graph.root().keys().rev().cloned().collect();
    if search.walk(&mut pending) {
        tracing::debug!("resolved {} module(s)", search.selection.len());
        return Ok(Selection {
            releases: search.selection,
        });
    }
    let (_, failure) = search.failure.unwrap_or_else(|| {
        (
            0,
            Unsatisfiable {
                name: graph.root().keys().next().cloned().unwrap_or_default(),
                constraints: Vec::new(),
                rejections: Vec::new(),
            },
        )
    });
    Err(failure)
}

struct Search<'g> {
    graph: &'g ConstraintGraph,
    selection: BTreeMap<String, Arc<Release>>,
    /// Deepest exhausted name seen so far, keyed by selection depth.
    failure: Option<(usize, Unsatisfiable)>,
}

impl Search<'_> {
    /// Resolve every name on `pending` (a stack). On failure `pending` and
    /// the selection are left exactly as they were on entry.
    fn walk(&mut self, pending: &mut Vec<String>) -> bool {
        let Some(name) = pending.pop() else {
            return true;
        };

        if self.selection.contains_key(&name) {
            if self.walk(pending) {
                return true;
            }
            pending.push(name);
            return false;
        }

        let mut rejections = Vec::new();
        for candidate in self.graph.candidates(&name) {
            if let Err(reason) = self.admissible(&name, candidate) {
                rejections.push(Rejection {
                    release: candidate.to_string(),
                    reason,
                });
                continue;
            }

            self.selection.insert(name.clone(), Arc::clone(candidate));
            let mark = pending.len();
            for dep in candidate.dependencies().keys().rev() {
                if !self.selection.contains_key(dep) {
                    pending.push(dep.clone());
                }
            }
            if self.walk(pending) {
                return true;
            }
            pending.truncate(mark);
            self.selection.remove(&name);
            rejections.push(Rejection {
                release: candidate.to_string(),
                reason: "its dependencies could not be satisfied".to_string(),
            });
        }

        self.record_failure(&name, rejections);
        pending.push(name);
        false
    }

    fn admissible(&self, name: &str, candidate: &Release) -> Result<(), String> {
        if let Some(range) = self.graph.root().get(name) {
            if !range.includes(candidate.version()) {
                return Err(format!("excluded by requested version {range}"));
            }
        }

        for constraint in self.graph.constraints(name) {
            if !constraint.allows(candidate) {
                return Err(format!("excluded by {}", constraint.description));
            }
        }

        for (dependent, chosen) in &self.selection {
            if let Some(range) = chosen.dependencies().get(name) {
                if !range.includes(candidate.version()) {
                    return Err(format!("{dependent} requires {range}"));
                }
            }
        }

        for (dep, range) in candidate.dependencies() {
            if let Some(chosen) = self.selection.get(dep) {
                if !range.includes(chosen.version()) {
                    return Err(format!(
                        "requires {dep} {range} but {} is selected",
                        chosen.version()
                    ));
                }
            }
        }

        if !self.graph.graph_constraints().is_empty() {
            let mut partial: Vec<&Release> = self
                .selection
                .iter()
                .filter(|(selected, _)| selected.as_str() != name)
                .map(|(_, release)| release.as_ref())
                .collect();
            partial.push(candidate);
            for constraint in self.graph.graph_constraints() {
                if !constraint.allows(&partial) {
                    return Err(format!("excluded by {}", constraint.description));
                }
            }
        }

        Ok(())
    }

    fn record_failure(&mut self, name: &str, rejections: Vec<Rejection>) {
        let depth = self.selection.len();
        if matches!(&self.failure, Some((deepest, _)) if *deepest >= depth) {
            return;
        }

        let mut constraints = Vec::new();
        if let Some(range) = self.graph.root().get(name) {
            constraints.push(format!("requested {range}"));
        }
        for constraint in self.graph.constraints(name) {
            constraints.push(constraint.description.clone());
        }
        for (dependent, chosen) in &self.selection {
            if let Some(range) = chosen.dependencies().get(name) {
                constraints.push(format!("required by {dependent} v{} ({range})", chosen.version()));
            }
        }

        self.failure = Some((
            depth,
            Unsatisfiable {
                name: name.to_string(),
                constraints,
                rejections,
            },
        ));
    }
}
