use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use modkit_core::config::HostConfig;
use modkit_core::name;
use modkit_resolver::{Source, VersionRange};
use modkit_util::progress;

use crate::errors::{v, ModuleToolError};
use crate::installed::InstalledModules;
use crate::report::{Action, OperationReport, Outcome};
use crate::shared;

#[derive(Debug, Clone, Default)]
pub struct UpgradeOptions {
    /// Version range to upgrade within; the newest reachable version when `None`.
    pub version: Option<String>,
    /// Upgrade even with local changes, across pins, or to an older version.
    pub force: bool,
    pub ignore_dependencies: bool,
    /// Install roots searched for the installed module.
    pub modulepath: Vec<PathBuf>,
    pub working_dir: PathBuf,
    pub host: Option<HostConfig>,
}

/// Upgrade the installed module `request` in place.
///
/// Never fails: the outcome, including any error, is in the report.
pub async fn upgrade(request: &str, opts: &UpgradeOptions, remote: Arc<dyn Source>) -> OperationReport {
    let mut report = OperationReport::new(
        Action::Upgrade,
        &name::normalize(request),
        opts.version.as_deref().unwrap_or("latest"),
    );
    match run(opts, remote, &mut report).await {
        Ok(()) => report,
        Err(err @ ModuleToolError::VersionAlreadyInstalled { .. }) => {
            let newer = matches!(&err, ModuleToolError::VersionAlreadyInstalled { newer, .. } if !newer.is_empty());
            let mut report = report.fail(&err);
            if !newer {
                report.result = Outcome::Noop;
            }
            report
        }
        Err(err) => report.fail(&err),
    }
}

async fn run(opts: &UpgradeOptions, remote: Arc<dyn Source>, report: &mut OperationReport) -> Result<(), ModuleToolError> {
    let name = report.name.clone();
    let requested = report.version.clone();
    let ignore_dependencies = opts.force || opts.ignore_dependencies;

    let installed = Arc::new(InstalledModules::scan(&opts.modulepath));
    let module = installed
        .get(&name)
        .cloned()
        .ok_or_else(|| ModuleToolError::NotInstalled { name: name.clone() })?;
    let Some(installed_version) = module.version.clone() else {
        return Err(ModuleToolError::NotInstalled { name });
    };
    report.installed_version = Some(installed_version.to_string());
    report.install_dir = Some(module.modulepath.clone());
    progress::status_info(
        "Found",
        &format!("'{name}' ({}) in {} ...", v(&installed_version.to_string()), module.modulepath.display()),
    );

    if !opts.force {
        let changes = module.local_changes();
        if !changes.is_empty() {
            return Err(ModuleToolError::LocalChanges {
                action: "upgrade",
                name,
                requested,
                installed: installed_version.to_string(),
                changes,
            });
        }
    }

    let range = match &opts.version {
        Some(version) => VersionRange::parse(version)?,
        None => VersionRange::any(),
    };

    shared::clean_working_dir(&opts.working_dir);
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();
    if !opts.force {
        sources.push(Arc::clone(&installed) as Arc<dyn Source>);
    }
    let remote_label = remote.label();
    progress::status_info("Downloading", &format!("from {remote_label} ..."));
    sources.push(remote);

    let mut graph = shared::build_graph(&name, &range, &sources, ignore_dependencies).await?;
    let installed_text = installed_version.to_string();
    if graph.candidates(&name).iter().all(|release| release.installed_at().is_some()) {
        return Err(ModuleToolError::NoCandidateReleases {
            name,
            requested,
            installed: installed_text,
            registry: remote_label,
        });
    }
    shared::add_constraints(&mut graph, &installed, &name, opts.force, opts.host.as_ref());
    let selection = shared::resolve_graph(
        &graph,
        "upgrade",
        &name,
        &requested,
        Some(&installed_text),
        shared::possible_culprits(&installed, &name),
    )?;

    let child = selection.get(&name).cloned().ok_or_else(|| ModuleToolError::Failed {
        message: format!("Could not upgrade '{name}'; it is missing from the resolved set"),
    })?;
    if !opts.force && *child.version() <= installed_version {
        let newer: BTreeSet<_> = graph
            .candidates(&name)
            .iter()
            .map(|release| release.version())
            .filter(|version| **version > installed_version)
            .cloned()
            .collect();
        let culprits = shared::possible_culprits(&installed, &name);
        return Err(ModuleToolError::VersionAlreadyInstalled {
            name,
            requested,
            installed: installed_text,
            newer: newer.iter().map(ToString::to_string).collect(),
            culprits,
        });
    }

    shared::check_conflicts(&selection, &installed, &name, &requested)?;

    let targets = shared::install_targets(&selection, &installed, &module.modulepath);
    let modules = shared::apply(&selection, &targets, "upgrade", &name).await?;
    for module in &modules {
        progress::status("Upgraded", &format!("{} ({})", module.name, v(&module.version)));
    }

    report.graph = shared::install_graph(&name, &selection, &installed, &targets);
    report.affected_modules = Some(modules);
    report.result = Outcome::Success;
    Ok(())
}
