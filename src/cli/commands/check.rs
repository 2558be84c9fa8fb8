//! Check command - verify host dependencies

use crate::config::{Config, HostEnv};
use crate::deps;
use crate::error::BuilderResult;
use crate::process::SystemRunner;
use crate::ui::{self, UiContext};

/// Execute the check command
pub async fn execute(config: &Config) -> BuilderResult<()> {
    let ctx = UiContext::detect();
    let env = HostEnv::capture();
    let runner = SystemRunner::new(env.path.clone());

    ui::intro(&ctx, "Turnip build dependencies");
    let report = match deps::check(&runner, &config.dependencies, &ctx).await {
        Ok(report) => report,
        Err(e) => {
            ui::outro_error(&ctx, "Dependencies missing");
            return Err(e);
        }
    };

    match env.ndk_home {
        Some(ref ndk) => ui::step_info(&ctx, &format!("NDK provisioned at {}", ndk.display())),
        None => ui::step_info(
            &ctx,
            &format!("NDK {} will be downloaded or restored", config.toolchain.version),
        ),
    }
    if env.cache_root.is_none() {
        ui::remark(&ctx, "Toolchain cache disabled outside CI");
    }

    ui::outro_success(&ctx, &format!("All {} tools found", report.found.len()));
    Ok(())
}
