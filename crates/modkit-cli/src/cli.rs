//! CLI argument definitions for modkit.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "modkit",
    version,
    about = "Install and upgrade modules from a module registry",
    long_about = "modkit resolves a module and its dependencies against a module registry, \
                  reconciles the result with the modules already installed on the modulepath, \
                  and installs or upgrades them in place."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install a module and its dependencies
    Install {
        /// Module name (author-name) or path to a release archive
        name: String,
        /// Version or version range to install
        #[arg(long)]
        version: Option<String>,
        /// Install into this directory instead of the first modulepath entry
        #[arg(short = 'i', long)]
        target_dir: Option<PathBuf>,
        /// Reinstall over whatever is there, skipping all safety checks
        #[arg(short, long)]
        force: bool,
        /// Do not install dependencies
        #[arg(long)]
        ignore_dependencies: bool,
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Upgrade an installed module
    Upgrade {
        /// Installed module name (author-name)
        name: String,
        /// Version or version range to upgrade to
        #[arg(long)]
        version: Option<String>,
        /// Upgrade despite local changes, pins, or a lower version
        #[arg(short, long)]
        force: bool,
        /// Do not upgrade dependencies
        #[arg(long)]
        ignore_dependencies: bool,
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Search the registry for modules
    Search {
        /// Search term
        term: String,
        /// Registry base URL
        #[arg(long, env = "MODKIT_FORGE_URL")]
        forge_url: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = RenderAs::Human)]
        render_as: RenderAs,
    },
}

/// Options shared by install and upgrade.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Module install roots, separated like PATH
    #[arg(long)]
    pub modulepath: Option<String>,
    /// Registry base URL
    #[arg(long, env = "MODKIT_FORGE_URL")]
    pub forge_url: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = RenderAs::Human)]
    pub render_as: RenderAs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAs {
    Human,
    Json,
}

pub fn parse() -> Cli {
    Cli::parse()
}
