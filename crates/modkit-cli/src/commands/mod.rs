//! Command dispatch and handler modules.

mod install;
mod search;
mod upgrade;

use std::path::PathBuf;
use std::sync::Arc;

use miette::Result;

use modkit_core::config::GlobalConfig;
use modkit_forge::cache::WorkingDir;
use modkit_forge::{ForgeClient, ForgeSource};
use modkit_ops::report::OperationReport;

use crate::cli::{Cli, Command, CommonArgs, RenderAs};

/// Route a parsed CLI invocation to its handler. Returns whether the
/// command succeeded.
pub async fn dispatch(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Install {
            name,
            version,
            target_dir,
            force,
            ignore_dependencies,
            common,
        } => install::exec(&name, version, target_dir, force, ignore_dependencies, &common).await,
        Command::Upgrade {
            name,
            version,
            force,
            ignore_dependencies,
            common,
        } => upgrade::exec(&name, version, force, ignore_dependencies, &common).await,
        Command::Search {
            term,
            forge_url,
            render_as,
        } => search::exec(&term, forge_url, render_as).await,
    }
}

/// Global configuration with command-line overrides applied.
struct Settings {
    config: GlobalConfig,
    modulepath: Vec<PathBuf>,
    render_as: RenderAs,
}

impl Settings {
    fn load(common: &CommonArgs) -> Result<Self> {
        let mut config = GlobalConfig::load()?;
        if let Some(url) = &common.forge_url {
            config.forge.url = url.clone();
        }
        let modulepath = match &common.modulepath {
            Some(list) => std::env::split_paths(list).collect(),
            None => config.modulepath(),
        };
        modkit_util::progress::set_quiet(common.render_as == RenderAs::Json);
        Ok(Self {
            config,
            modulepath,
            render_as: common.render_as,
        })
    }

    fn forge_source(&self) -> Result<Arc<ForgeSource>> {
        tracing::debug!("using registry {}", self.config.forge.url);
        let client = ForgeClient::new(&self.config.forge.url)?;
        Ok(Arc::new(ForgeSource::new(
            client,
            WorkingDir::new(&self.config.working_dir()),
            self.config.host.clone(),
        )))
    }
}

/// Print the report in the requested format and report success.
fn render(report: &OperationReport, render_as: RenderAs) -> Result<bool> {
    match render_as {
        RenderAs::Json => println!("{}", report.to_json()?),
        RenderAs::Human if report.is_success() => print!("{}", with_newline(report.render_human())),
        RenderAs::Human => eprint!("{}", with_newline(report.render_human())),
    }
    Ok(report.is_success())
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
