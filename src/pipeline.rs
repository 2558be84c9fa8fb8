//! End-to-end build pipeline
//!
//! check deps -> prepare -> build -> package, once from the pristine
//! checkout and once more with the patch set applied when there is one.
//! Passes run strictly one after the other and share the workdir.

use crate::build::MesonBuild;
use crate::cache::ToolchainCache;
use crate::config::{Config, HostEnv};
use crate::context::BuildContext;
use crate::deps;
use crate::error::BuilderResult;
use crate::fetch::Fetcher;
use crate::package::{BuildDate, PackageOutput, Packager};
use crate::process::CommandRunner;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::workdir::{PatchList, Preparer, Toolchain, Workdir};
use std::path::PathBuf;
use tracing::info;

/// Result of one pass
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub context: BuildContext,
    pub package: PackageOutput,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub workdir: PathBuf,
    pub passes: Vec<PassOutput>,
}

pub struct Pipeline<'a> {
    pub config: &'a Config,
    pub env: &'a HostEnv,
    pub runner: &'a dyn CommandRunner,
    pub fetcher: &'a dyn Fetcher,
    pub cache: &'a ToolchainCache,
    pub ui: &'a UiContext,
}

impl Pipeline<'_> {
    pub async fn run(&self) -> BuilderResult<RunSummary> {
        self.run_on(BuildDate::today()).await
    }

    /// Run with a fixed build date
    pub async fn run_on(&self, date: BuildDate) -> BuilderResult<RunSummary> {
        let config = self.config;

        ui::section(self.ui, "Dependencies");
        deps::remediate(self.runner, &config.dependencies, self.ui).await;
        deps::check(self.runner, &config.dependencies, self.ui).await?;

        let patches = PatchList::assemble(&config.patches.experimental, &config.patches.apply)?;
        let workdir = Workdir::init(&config.general.workdir, config).await?;
        info!("Work directory {}", workdir.root().display());

        let preparer = Preparer {
            config,
            env: self.env,
            workdir: &workdir,
            runner: self.runner,
            fetcher: self.fetcher,
            cache: self.cache,
        };

        ui::section(self.ui, "Unpatched build");
        let mut spinner = TaskSpinner::new(self.ui);
        spinner.start("Preparing source tree...");
        let (toolchain, context) = match preparer.first_pass().await {
            Ok(prepared) => prepared,
            Err(e) => {
                spinner.stop_error("Preparation failed");
                return Err(e);
            }
        };
        spinner.stop(&format!("Source at {}", context.commit_short()));
        let mut passes = vec![self.build_and_package(&workdir, &toolchain, context, &date).await?];

        if patches.is_empty() {
            info!("No patches configured, skipping patched build");
        } else {
            ui::section(self.ui, "Patched build");
            let mut spinner = TaskSpinner::new(self.ui);
            spinner.start(&format!("Applying {} patch(es)...", patches.len()));
            let previous = &passes[0].context;
            let (toolchain, context) = match preparer.patched_pass(previous, &patches).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    spinner.stop_error("Patching failed");
                    return Err(e);
                }
            };
            spinner.stop(&format!("Applied {} patch(es)", patches.len()));
            passes.push(self.build_and_package(&workdir, &toolchain, context, &date).await?);
        }

        Ok(RunSummary {
            workdir: workdir.root().to_path_buf(),
            passes,
        })
    }

    async fn build_and_package(
        &self,
        workdir: &Workdir,
        toolchain: &Toolchain,
        context: BuildContext,
        date: &BuildDate,
    ) -> BuilderResult<PassOutput> {
        let build = MesonBuild {
            runner: self.runner,
            config: &self.config.build,
            workdir,
        };
        let mut spinner = TaskSpinner::new(self.ui);
        spinner.start(&format!("Compiling {} driver...", context.label()));
        let artifact = match build.run(toolchain, &context).await {
            Ok(artifact) => artifact,
            Err(e) => {
                spinner.stop_error("Build failed");
                return Err(e);
            }
        };
        spinner.stop("Build finished");

        let packager = Packager {
            runner: self.runner,
            config: &self.config.package,
            web_base: &self.config.source.web_base,
            workdir,
        };
        let package = packager.package(&artifact, &context, date).await?;
        ui::step_ok_detail(
            self.ui,
            &format!("Packaged {} driver", context.label()),
            &package.archive.display().to_string(),
        );

        Ok(PassOutput { context, package })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuilderError;
    use crate::testing::{RecordingFetcher, ScriptedRunner};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn config(dir: &TempDir, patches: &[&str]) -> Config {
        let mut config = Config::default();
        config.general.workdir = dir.path().join("turnip_workdir");
        config.patches.apply = patches.iter().map(|p| p.to_string()).collect();
        config
    }

    fn date() -> BuildDate {
        BuildDate::new(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap())
    }

    async fn run(
        config: &Config,
        runner: &ScriptedRunner,
        fetcher: &RecordingFetcher,
    ) -> BuilderResult<RunSummary> {
        let env = HostEnv::default();
        let cache = ToolchainCache::disabled();
        let ui = UiContext::non_interactive();
        Pipeline {
            config,
            env: &env,
            runner,
            fetcher,
            cache: &cache,
            ui: &ui,
        }
        .run_on(date())
        .await
    }

    fn read(summary: &RunSummary, name: &str) -> String {
        std::fs::read_to_string(summary.workdir.join(name)).unwrap()
    }

    #[tokio::test]
    async fn no_patches_means_single_pass() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &[]);
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::new();

        let summary = run(&config, &runner, &fetcher).await.unwrap();

        assert_eq!(summary.passes.len(), 1);
        assert!(!summary.passes[0].context.patched);
        assert_eq!(read(&summary, "patched"), "false");
        assert!(read(&summary, "description").ends_with("\nNo patch"));
        assert_eq!(runner.calls_to("zip").len(), 1);
        assert_eq!(runner.calls_to("ninja").len(), 1);
        assert!(summary.passes[0].package.archive.is_file());
    }

    #[tokio::test]
    async fn patches_applied_in_order_and_listed_verbatim() {
        let dir = TempDir::new().unwrap();
        let descriptors = [
            "fix-anon-file;merge_requests/27856;",
            "revert-gmem;commit/9f3c2a1;--reverse",
            "kgsl-tweak;merge_requests/31012;",
        ];
        let config = config(&dir, &descriptors);
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::new();

        let summary = run(&config, &runner, &fetcher).await.unwrap();

        assert_eq!(summary.passes.len(), 2);
        let patched = &summary.passes[1];
        assert!(patched.context.patched);
        assert!(patched
            .package
            .archive
            .to_string_lossy()
            .ends_with("turnip_Mar-07-2025_0123456_patched.zip"));

        let applied: Vec<String> = runner
            .calls_to("git")
            .into_iter()
            .filter(|c| c.subcommand() == Some("apply"))
            .map(|c| c.args.last().cloned().unwrap())
            .collect();
        assert_eq!(applied.len(), 3);
        assert!(applied[0].ends_with("01-fix-anon-file.patch"));
        assert!(applied[1].ends_with("02-revert-gmem.patch"));
        assert!(applied[2].ends_with("03-kgsl-tweak.patch"));

        let description = read(&summary, "description");
        let listed: Vec<&str> = description.lines().skip(1).collect();
        let expected: Vec<String> = descriptors.iter().map(|d| format!("- {}", d)).collect();
        assert_eq!(listed, expected);
        assert_eq!(read(&summary, "patched"), "true");
    }

    #[tokio::test]
    async fn experimental_patches_go_first() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, &["stable;merge_requests/1;"]);
        config.patches.experimental = vec!["exp;merge_requests/2;".to_string()];
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::new();

        run(&config, &runner, &fetcher).await.unwrap();

        let urls = fetcher.urls();
        let patch_urls: Vec<&String> = urls.iter().filter(|u| u.ends_with(".patch")).collect();
        assert!(patch_urls[0].ends_with("merge_requests/2.patch"));
        assert!(patch_urls[1].ends_with("merge_requests/1.patch"));
    }

    #[tokio::test]
    async fn driver_version_in_metadata() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &[]);
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::new();

        let summary = run(&config, &runner, &fetcher).await.unwrap();

        let meta = std::fs::read_to_string(summary.workdir.join("turnip_module/meta.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(json["driverVersion"], "25.1.0-devel/vk1.4.303");
    }

    #[tokio::test]
    async fn unchanged_upstream_keeps_commit() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &["a;commit/aa;"]);
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::new();

        let summary = run(&config, &runner, &fetcher).await.unwrap();

        assert_eq!(
            summary.passes[0].context.commit(),
            summary.passes[1].context.commit()
        );
        assert!(runner
            .calls_to("git")
            .iter()
            .all(|c| c.subcommand() != Some("merge")));
    }

    #[tokio::test]
    async fn advanced_upstream_moves_patched_commit() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &["a;commit/aa;"]);
        let runner = ScriptedRunner::new();
        runner.set_upstream("fedcba9876543210fedcba9876543210fedcba98");
        let fetcher = RecordingFetcher::new();

        let summary = run(&config, &runner, &fetcher).await.unwrap();

        assert_eq!(summary.passes[1].context.commit_short(), "fedcba9");
        assert_ne!(
            summary.passes[0].context.commit(),
            summary.passes[1].context.commit()
        );
        assert_eq!(read(&summary, "tag"), "25.1.0-devel_fedcba9");
    }

    #[tokio::test]
    async fn missing_artifact_aborts_without_archive() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &["a;commit/aa;"]);
        let runner = ScriptedRunner::new().without_artifact();
        let fetcher = RecordingFetcher::new();

        let err = run(&config, &runner, &fetcher).await.unwrap_err();

        assert!(matches!(err, BuilderError::ArtifactMissing(_)));
        assert!(runner.calls_to("zip").is_empty());
        assert_eq!(runner.calls_to("ninja").len(), 1);
    }

    #[tokio::test]
    async fn missing_dependencies_stop_before_network_and_build() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &["a;commit/aa;"]);
        let runner = ScriptedRunner::new().without_tools(&["meson", "patchelf"]);
        let fetcher = RecordingFetcher::new();

        let err = run(&config, &runner, &fetcher).await.unwrap_err();

        match err {
            BuilderError::MissingDependencies { missing } => {
                assert_eq!(missing, vec!["meson", "patchelf"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fetcher.urls().is_empty());
        assert!(runner
            .calls()
            .iter()
            .all(|c| c.program == "pip"));
        assert!(!config.general.workdir.exists());
    }

    #[tokio::test]
    async fn bad_descriptor_fails_before_cloning() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &["no-source"]);
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::new();

        let err = run(&config, &runner, &fetcher).await.unwrap_err();

        assert!(matches!(err, BuilderError::InvalidPatch { .. }));
        assert!(runner.calls_to("git").is_empty());
    }

    #[tokio::test]
    async fn failed_patch_download_aborts_patched_pass() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, &["a;commit/aa;"]);
        config.general.workdir = dir.path().join("work");
        let env = HostEnv {
            ndk_home: Some(dir.path().join("ndk")),
            ..HostEnv::default()
        };
        let runner = ScriptedRunner::new();
        let fetcher = RecordingFetcher::failing();
        let cache = ToolchainCache::disabled();
        let ui = UiContext::non_interactive();

        let err = Pipeline {
            config: &config,
            env: &env,
            runner: &runner,
            fetcher: &fetcher,
            cache: &cache,
            ui: &ui,
        }
        .run_on(date())
        .await
        .unwrap_err();

        assert!(err.is_network());
        assert_eq!(runner.calls_to("zip").len(), 1);
        assert!(runner
            .calls_to("git")
            .iter()
            .all(|c| c.subcommand() != Some("apply")));
    }
}
