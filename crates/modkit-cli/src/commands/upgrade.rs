//! Handler for `modkit upgrade`.

use miette::Result;

use modkit_ops::ops_upgrade::{self, UpgradeOptions};

use super::{render, Settings};
use crate::cli::CommonArgs;

pub async fn exec(
    name: &str,
    version: Option<String>,
    force: bool,
    ignore_dependencies: bool,
    common: &CommonArgs,
) -> Result<bool> {
    let settings = Settings::load(common)?;
    let opts = UpgradeOptions {
        version,
        force,
        ignore_dependencies,
        modulepath: settings.modulepath.clone(),
        working_dir: settings.config.working_dir(),
        host: settings.config.host.clone(),
    };

    let report = ops_upgrade::upgrade(name, &opts, settings.forge_source()?).await;
    render(&report, settings.render_as)
}
