use std::path::{Path, PathBuf};
use std::sync::Arc;

use modkit_core::config::HostConfig;
use modkit_core::name;
use modkit_forge::cache::WorkingDir;
use modkit_forge::LocalArchiveSource;
use modkit_resolver::{Source, Version, VersionRange};
use modkit_util::progress;

use crate::errors::{v, ModuleToolError};
use crate::install_dir::InstallDirectory;
use crate::installed::InstalledModules;
use crate::report::{Action, OperationReport, Outcome};
use crate::shared;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Requested version range; any version when `None`.
    pub version: Option<String>,
    /// Skip every safety check and reinstall over what is there.
    pub force: bool,
    /// Install only the requested module.
    pub ignore_dependencies: bool,
    /// Where new modules go.
    pub target_dir: PathBuf,
    /// Install roots searched for existing modules, after `target_dir`.
    pub modulepath: Vec<PathBuf>,
    /// Scratch space for downloads and staging.
    pub working_dir: PathBuf,
    pub host: Option<HostConfig>,
}

/// Install `request` (an `author-name` or a path to a release archive) and
/// its dependencies.
///
/// Never fails: the outcome, including any error, is in the report.
pub async fn install(request: &str, opts: &InstallOptions, remote: Arc<dyn Source>) -> OperationReport {
    let mut report = OperationReport::new(
        Action::Install,
        &name::normalize(request),
        opts.version.as_deref().unwrap_or("latest"),
    );
    match run(request, opts, remote, &mut report).await {
        Ok(()) => report,
        Err(err) => report.fail(&err),
    }
}

async fn run(
    request: &str,
    opts: &InstallOptions,
    remote: Arc<dyn Source>,
    report: &mut OperationReport,
) -> Result<(), ModuleToolError> {
    let ignore_dependencies = opts.force || opts.ignore_dependencies;
    shared::clean_working_dir(&opts.working_dir);

    let local = if Path::new(request).is_file() {
        let archive = LocalArchiveSource::open(Path::new(request), WorkingDir::new(&opts.working_dir))
            .map_err(|e| ModuleToolError::InvalidModule {
                action: "install",
                name: request.to_string(),
                message: e.to_string(),
            })?;
        report.name = archive.full_name();
        report.version = archive.metadata().version.clone();
        Some(Arc::new(archive))
    } else {
        None
    };

    let name = name::normalize(&report.name);
    let requested = report.version.clone();
    if !name::is_full_name(&name) {
        return Err(ModuleToolError::InvalidModule {
            action: "install",
            name,
            message: "module names must be of the form 'author-name'".to_string(),
        });
    }
    let range = match (&local, &opts.version) {
        (Some(archive), _) => VersionRange::exact(&Version::parse(&archive.metadata().version)?),
        (None, Some(version)) => VersionRange::parse(version)?,
        (None, None) => VersionRange::any(),
    };

    let mut modulepath = vec![opts.target_dir.clone()];
    modulepath.extend(opts.modulepath.iter().filter(|p| **p != opts.target_dir).cloned());
    let installed = Arc::new(InstalledModules::scan(&modulepath));

    if !opts.force {
        if let Some(module) = installed.get(&name) {
            let installed_version = module.version.as_ref().map(ToString::to_string).unwrap_or_default();
            report.installed_version = Some(installed_version.clone());
            let local_changes = module.local_changes();
            let included = module.version.as_ref().is_some_and(|version| range.includes(version));
            if included {
                tracing::info!("{name} {installed_version} is already installed");
                report.result = Outcome::Noop;
                if !local_changes.is_empty() {
                    let err = ModuleToolError::AlreadyInstalled {
                        name,
                        installed: installed_version,
                        requested,
                        local_changes,
                    };
                    report.error = Some((&err).into());
                }
                return Ok(());
            }
            return Err(ModuleToolError::AlreadyInstalled {
                name,
                installed: installed_version,
                requested,
                local_changes,
            });
        }
    }

    let install_dir = InstallDirectory::new(&opts.target_dir);
    install_dir.prepare(&name, &requested)?;
    report.install_dir = Some(install_dir.target().to_path_buf());

    let mut sources: Vec<Arc<dyn Source>> = Vec::new();
    if let Some(archive) = &local {
        sources.push(Arc::clone(archive) as Arc<dyn Source>);
    }
    if local.is_none() || !ignore_dependencies {
        if !opts.force {
            sources.push(Arc::clone(&installed) as Arc<dyn Source>);
        }
        progress::status_info("Downloading", &format!("from {} ...", remote.label()));
        sources.push(remote);
    }

    let mut graph = shared::build_graph(&name, &range, &sources, ignore_dependencies).await?;
    shared::add_constraints(&mut graph, &installed, &name, opts.force, opts.host.as_ref());
    let selection = shared::resolve_graph(&graph, "install", &name, &requested, None, Vec::new())?;
    tracing::debug!("selected {} release(s)", selection.len());

    shared::check_conflicts(&selection, &installed, &name, &requested)?;

    let targets = shared::install_targets(&selection, &installed, install_dir.target());
    let modules = shared::apply(&selection, &targets, "install", &name).await?;
    for module in &modules {
        progress::status("Installed", &format!("{} ({})", module.name, v(&module.version)));
    }

    report.graph = shared::install_graph(&name, &selection, &installed, &targets);
    report.installed_modules = Some(modules);
    report.result = Outcome::Success;
    Ok(())
}
