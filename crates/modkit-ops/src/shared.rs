//! Steps common to install and upgrade.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::try_join_all;

use modkit_core::config::HostConfig;
use modkit_forge::cache::WorkingDir;
use modkit_resolver::{resolve, ConstraintGraph, Release, Selection, Source, Version, VersionRange};
use modkit_util::progress;

use crate::errors::ModuleToolError;
use crate::installed::InstalledModules;
use crate::report::{InstallNode, ModuleSummary, NodeAction};

/// Remove leftovers of earlier runs from the working directory.
pub(crate) fn clean_working_dir(dir: &Path) {
    if let Err(e) = WorkingDir::new(dir).clean() {
        tracing::warn!("could not clean {}: {e}", dir.display());
    }
}

/// Build the candidate graph for `name`, expanding dependencies unless asked not to.
pub(crate) async fn build_graph(
    name: &str,
    range: &VersionRange,
    sources: &[Arc<dyn Source>],
    ignore_dependencies: bool,
) -> Result<ConstraintGraph, ModuleToolError> {
    let pb = progress::spinner("Resolving dependencies ...");
    let graph = if ignore_dependencies {
        ConstraintGraph::without_dependencies(name, range.clone(), sources).await
    } else {
        let mut graph = ConstraintGraph::for_module(name, range.clone());
        graph.query(sources).await.map(|()| graph)
    };
    pb.finish_and_clear();
    Ok(graph?)
}

/// Layer the policy constraints on top of the declared dependencies.
pub(crate) fn add_constraints(
    graph: &mut ConstraintGraph,
    installed: &InstalledModules,
    root: &str,
    force: bool,
    host: Option<&HostConfig>,
) {
    add_name_collision_constraint(graph);
    if force {
        return;
    }
    if let Some(host) = host {
        add_host_requirement_constraints(graph, host);
    }
    add_installed_constraints(graph, installed, root);
}

/// Modules are installed by their unqualified name, so two authors' modules
/// of the same name can never be selected together.
fn add_name_collision_constraint(graph: &mut ConstraintGraph) {
    graph.add_graph_constraint(
        "collision",
        "no two modules may share an install directory",
        |selection: &[&Release]| {
            let mut dirs = BTreeSet::new();
            selection.iter().all(|release| dirs.insert(release.dir_name()))
        },
    );
}

fn add_host_requirement_constraints(graph: &mut ConstraintGraph, host: &HostConfig) {
    let version = match Version::parse(&host.version) {
        Ok(version) => version,
        Err(e) => {
            tracing::warn!("ignoring host requirements: {e}");
            return;
        }
    };
    let names: Vec<String> = graph.names().map(str::to_string).collect();
    for name in names {
        let host_name = host.name.clone();
        let version = version.clone();
        graph.add_constraint(
            "host",
            &name,
            format!("compatibility with {} {}", host.name, host.version),
            move |release| match release.metadata().host_requirement(&host_name) {
                Some(requirement) => VersionRange::parse_or_empty(requirement).includes(&version),
                None => true,
            },
        );
    }
}

/// Installed modules other than `root` may only move forward within their
/// major version, and their own dependency ranges stay in force.
fn add_installed_constraints(graph: &mut ConstraintGraph, installed: &InstalledModules, root: &str) {
    for (name, module) in installed.modules() {
        if name == root {
            continue;
        }
        let (Some(version), Some(metadata)) = (&module.version, &module.metadata) else {
            continue;
        };
        let pin = VersionRange::same_major_at_least(version);
        graph.add_range_constraint(
            "installed",
            name,
            format!("the installed version pin ({pin})"),
            pin,
        );
        for (dependency, requirement) in metadata.dependency_requirements() {
            graph.add_range_constraint(
                &format!("{name} constraint"),
                &dependency,
                format!("installed {name} v{version} ({requirement})"),
                VersionRange::parse_or_empty(&requirement),
            );
        }
    }
}

/// Resolve the graph, mapping failure to the user-facing error.
///
/// `culprits` names the installed modules reported as possibly in the way.
pub(crate) fn resolve_graph(
    graph: &ConstraintGraph,
    action: &'static str,
    name: &str,
    requested: &str,
    installed: Option<&str>,
    culprits: Vec<String>,
) -> Result<Selection, ModuleToolError> {
    resolve(graph).map_err(|conflict| ModuleToolError::NoVersionsSatisfy {
        action,
        name: name.to_string(),
        requested: requested.to_string(),
        installed: installed.map(str::to_string),
        conflict,
        culprits,
    })
}

/// Installed modules other than `name` that took part in the resolution.
pub(crate) fn possible_culprits(installed: &InstalledModules, name: &str) -> Vec<String> {
    installed.fetched().into_iter().filter(|n| n != name).collect()
}

/// Fail if a selected release would overwrite a directory occupied by a
/// different module. Nothing has touched the disk at this point.
pub(crate) fn check_conflicts(
    selection: &Selection,
    installed: &InstalledModules,
    name: &str,
    requested: &str,
) -> Result<(), ModuleToolError> {
    for release in selection.releases() {
        if release.installed_at().is_some() {
            continue;
        }
        let Some(occupant) = installed.by_dir(release.dir_name()) else {
            continue;
        };
        if occupant.full_name().as_deref() == Some(release.name()) {
            continue;
        }
        let dependency = (release.name() != name)
            .then(|| (release.name().to_string(), release.version().to_string()));
        let occupant_id = occupant
            .metadata
            .as_ref()
            .map(|m| (m.full_name(), m.version.clone()));
        return Err(ModuleToolError::InstallConflict {
            name: name.to_string(),
            requested: requested.to_string(),
            dependency,
            directory: occupant.path.clone(),
            occupant: occupant_id,
        });
    }
    Ok(())
}

/// Where each release goes: next to its installed copy, or into `default_dir`.
pub(crate) fn install_targets(
    selection: &Selection,
    installed: &InstalledModules,
    default_dir: &Path,
) -> BTreeMap<String, PathBuf> {
    selection
        .releases()
        .filter(|release| release.installed_at().is_none())
        .map(|release| {
            let target = installed
                .get(release.name())
                .map(|module| module.modulepath.clone())
                .unwrap_or_else(|| default_dir.to_path_buf());
            (release.name().to_string(), target)
        })
        .collect()
}

/// Stage every release that has to change, then move them into place in
/// dependency order.
///
/// Staging happens up front so that a failed download leaves the modulepath
/// untouched. A failure while installing reports what was already written.
pub(crate) async fn apply(
    selection: &Selection,
    targets: &BTreeMap<String, PathBuf>,
    action: &'static str,
    name: &str,
) -> Result<Vec<ModuleSummary>, ModuleToolError> {
    let pending: Vec<Arc<Release>> = selection
        .dependency_order()
        .into_iter()
        .filter(|release| targets.contains_key(release.name()))
        .collect();

    try_join_all(pending.iter().map(|release| release.prepare())).await?;

    let verb = if action == "upgrade" { "Upgrading" } else { "Installing" };
    progress::status(verb, "-- do not interrupt ...");

    let mut done: Vec<ModuleSummary> = Vec::with_capacity(pending.len());
    for release in &pending {
        let parent = &targets[release.name()];
        match release.install(parent).await {
            Ok(path) => {
                tracing::info!("installed {release} into {}", path.display());
                done.push(ModuleSummary {
                    name: release.name().to_string(),
                    version: release.version().to_string(),
                    path,
                });
            }
            Err(e) => {
                return Err(ModuleToolError::PartialInstall {
                    action,
                    name: name.to_string(),
                    installed: done,
                    failed: release.name().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(done)
}

/// The tree of changed modules rooted at `root`.
///
/// Releases left in place are not shown, but what they pull in is.
pub(crate) fn install_graph(
    root: &str,
    selection: &Selection,
    installed: &InstalledModules,
    targets: &BTreeMap<String, PathBuf>,
) -> Vec<InstallNode> {
    let mut graphed = BTreeSet::from([root.to_string()]);
    let Some(release) = selection.get(root) else {
        return Vec::new();
    };
    if !targets.contains_key(root) {
        return children(release, selection, installed, targets, &mut graphed);
    }
    vec![node(release, selection, installed, targets, &mut graphed)]
}

fn node(
    release: &Release,
    selection: &Selection,
    installed: &InstalledModules,
    targets: &BTreeMap<String, PathBuf>,
    graphed: &mut BTreeSet<String>,
) -> InstallNode {
    let previous_version = installed
        .get(release.name())
        .and_then(|module| module.version.as_ref())
        .map(ToString::to_string);
    let version = release.version().to_string();
    let action = match &previous_version {
        Some(previous) if *previous != version => NodeAction::Upgrade,
        _ => NodeAction::Install,
    };
    InstallNode {
        name: release.name().to_string(),
        version,
        previous_version,
        path: targets.get(release.name()).cloned().unwrap_or_default(),
        action,
        dependencies: children(release, selection, installed, targets, graphed),
    }
}

fn children(
    release: &Release,
    selection: &Selection,
    installed: &InstalledModules,
    targets: &BTreeMap<String, PathBuf>,
    graphed: &mut BTreeSet<String>,
) -> Vec<InstallNode> {
    let mut nodes = Vec::new();
    for dependency in release.dependencies().keys() {
        if !graphed.insert(dependency.clone()) {
            continue;
        }
        let Some(dep) = selection.get(dependency) else {
            continue;
        };
        if targets.contains_key(dependency) {
            nodes.push(node(dep, selection, installed, targets, graphed));
        } else {
            nodes.extend(children(dep, selection, installed, targets, graphed));
        }
    }
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    nodes
}
