//! Handler for `modkit install`.

use std::path::PathBuf;

use miette::Result;

use modkit_ops::ops_install::{self, InstallOptions};

use super::{render, Settings};
use crate::cli::CommonArgs;

pub async fn exec(
    name: &str,
    version: Option<String>,
    target_dir: Option<PathBuf>,
    force: bool,
    ignore_dependencies: bool,
    common: &CommonArgs,
) -> Result<bool> {
    let settings = Settings::load(common)?;
    let target_dir = match target_dir.or_else(|| settings.modulepath.first().cloned()) {
        Some(dir) => dir,
        None => {
            return Err(modkit_util::errors::ModkitError::Config {
                message: "no install directory: pass --target-dir or configure paths.modulepath".to_string(),
            }
            .into())
        }
    };

    let opts = InstallOptions {
        version,
        force,
        ignore_dependencies,
        target_dir,
        modulepath: settings.modulepath.clone(),
        working_dir: settings.config.working_dir(),
        host: settings.config.host.clone(),
    };

    let report = ops_install::install(name, &opts, settings.forge_source()?).await;
    render(&report, settings.render_as)
}
