//! Build command - run the full pipeline

use crate::cache::ToolchainCache;
use crate::cli::args::BuildArgs;
use crate::config::{Config, HostEnv};
use crate::error::BuilderResult;
use crate::fetch::HttpFetcher;
use crate::pipeline::Pipeline;
use crate::process::SystemRunner;
use crate::ui::{self, UiContext};
use std::time::Duration;
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> BuilderResult<()> {
    let ctx = UiContext::detect();
    let config = apply_args(args, config);

    let env = HostEnv::capture();
    let runner = SystemRunner::new(env.path.clone());
    let fetcher = HttpFetcher::new(Duration::from_secs(config.patches.retry_delay_secs))
        .with_progress(ctx.use_fancy_output());
    let cache = ToolchainCache::from_env(&env);
    debug!("Toolchain cache enabled: {}", cache.is_enabled());

    ui::intro(&ctx, &format!("Turnip build ({})", config.build.arch));

    let pipeline = Pipeline {
        config: &config,
        env: &env,
        runner: &runner,
        fetcher: &fetcher,
        cache: &cache,
        ui: &ctx,
    };
    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            ui::outro_error(&ctx, "Build failed");
            return Err(e);
        }
    };

    ui::section(&ctx, "Artifacts");
    for pass in &summary.passes {
        ui::key_value(
            &ctx,
            pass.context.label(),
            &pass.package.archive.display().to_string(),
        );
        ui::key_value(&ctx, "driver", &pass.package.metadata.driver_version);
        ui::key_value(&ctx, "sha256", &pass.package.checksum);
    }
    ui::outro_success(
        &ctx,
        &format!("Outputs in {}", summary.workdir.display()),
    );

    Ok(())
}

/// Command-line overrides on top of the loaded configuration
fn apply_args(args: BuildArgs, config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(arch) = args.arch {
        config.build.arch = arch;
    }
    if args.no_patches {
        config.patches.apply.clear();
        config.patches.experimental.clear();
    }
    config.patches.apply.extend(args.patches);
    config
}
