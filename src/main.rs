//! turnip-builder - Turnip Vulkan driver build automation
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use turnip_builder::cli::{BuildArgs, Cli, Commands};
use turnip_builder::config::ConfigManager;
use turnip_builder::error::{BuilderError, BuilderResult};
use turnip_builder::ui;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuilderResult<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().map_err(|e| BuilderError::io("getting current directory", e))?;
    let manager = ConfigManager::discover(cli.config.clone(), &cwd);
    let mut config = manager.load().await?;
    if let Some(workdir) = cli.workdir {
        config.general.workdir = workdir;
    }

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("turnip_builder=warn"),
        1 => EnvFilter::new("turnip_builder=info"),
        _ => EnvFilter::new("turnip_builder=debug"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    tracing::debug!("Configuration from {}", manager.path().display());

    ui::init_theme();

    match cli.command {
        None => turnip_builder::cli::commands::build(BuildArgs::default(), &config).await,
        Some(Commands::Build(args)) => turnip_builder::cli::commands::build(args, &config).await,
        Some(Commands::Check) => turnip_builder::cli::commands::check(&config).await,
        Some(Commands::Config(args)) => {
            turnip_builder::cli::commands::config(args, &manager, &config).await
        }
    }
}
