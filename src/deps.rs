//! Host dependency checking
//!
//! Every required tool must resolve before the pipeline touches the network
//! or starts a build. There is no soft-fail path.

use crate::config::schema::DependenciesConfig;
use crate::error::{BuilderError, BuilderResult};
use crate::process::{CommandRunner, Invocation};
use crate::ui::{self, UiContext};
use tracing::{debug, warn};

/// Outcome of probing the host for required tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

impl DependencyReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Convert into an error naming every missing tool
    pub fn into_result(self) -> BuilderResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(BuilderError::MissingDependencies {
                missing: self.missing,
            })
        }
    }
}

/// Probe every tool and report each one
pub async fn probe_all(
    runner: &dyn CommandRunner,
    tools: &[String],
    ctx: &UiContext,
) -> DependencyReport {
    let mut report = DependencyReport::default();

    for tool in tools {
        if runner.probe(tool).await {
            ui::step_ok(ctx, &format!("{} found", tool));
            report.found.push(tool.clone());
        } else {
            ui::step_error(ctx, &format!("{} not found", tool));
            report.missing.push(tool.clone());
        }
    }

    report
}

/// Check that every required tool is installed
pub async fn check(
    runner: &dyn CommandRunner,
    config: &DependenciesConfig,
    ctx: &UiContext,
) -> BuilderResult<DependencyReport> {
    probe_all(runner, &config.required, ctx).await.into_result()
}

/// Best-effort install of the python packages Mesa's generators import.
///
/// Runs before the check. Failures are logged and ignored; the check that
/// follows is what decides whether the run continues. Returns whether the
/// packages were installed.
pub async fn remediate(
    runner: &dyn CommandRunner,
    config: &DependenciesConfig,
    ctx: &UiContext,
) -> bool {
    if !config.remediate || config.python_packages.is_empty() {
        debug!("Dependency remediation disabled");
        return false;
    }

    let upgrade = Invocation::new("pip").args(["install", "--upgrade", "pip"]);
    let install = Invocation::new("pip")
        .arg("install")
        .args(config.python_packages.iter().cloned());

    let mut installed = false;
    for invocation in [upgrade, install] {
        installed = match runner.run(&invocation).await {
            Ok(output) if output.success() => {
                debug!("{} succeeded", invocation);
                true
            }
            Ok(output) => {
                warn!("{} exited with {:?}", invocation, output.code);
                false
            }
            Err(e) => {
                warn!("{} could not run: {}", invocation, e);
                false
            }
        };
    }

    let packages = config.python_packages.join(", ");
    if installed {
        ui::remark(ctx, &format!("Python packages installed: {}", packages));
    } else {
        ui::step_warn(ctx, &format!("Python packages not installed: {}", packages));
    }
    installed
}
