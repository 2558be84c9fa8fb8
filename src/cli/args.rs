//! CLI argument definitions using clap derive

use crate::build::TargetArch;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Turnip driver builder
///
/// Clones Mesa, cross-compiles the Turnip Vulkan driver for Android and
/// packages it as a loadable driver archive, once unpatched and once with
/// the configured patch set.
#[derive(Parser, Debug)]
#[command(name = "turnip-builder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `build`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TURNIP_BUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Work directory (overrides general.workdir)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: check, prepare, build and package
    Build(BuildArgs),

    /// Check that every required host tool is installed
    Check,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Target architecture (aarch64 or arm)
    #[arg(long)]
    pub arch: Option<TargetArch>,

    /// Additional patch descriptor (name;source;args), may be repeated
    #[arg(long = "patch", value_name = "DESCRIPTOR")]
    pub patches: Vec<String>,

    /// Only build the unpatched driver
    #[arg(long, conflicts_with = "patches")]
    pub no_patches: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
