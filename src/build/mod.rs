//! Cross-build driver: meson setup followed by ninja

pub mod arch;
pub mod machine;

pub use arch::TargetArch;
pub use machine::{cross_file, native_file, MachineFile, MesonValue};

use crate::config::schema::BuildConfig;
use crate::context::BuildContext;
use crate::error::BuilderResult;
use crate::process::{CommandRunner, Invocation};
use crate::workdir::{Toolchain, Workdir};
use std::path::PathBuf;
use tracing::{debug, info};

/// Options every build passes to `meson setup`
fn base_options(sdk_version: u32) -> Vec<String> {
    vec![
        "-Dbuildtype=release".to_string(),
        "-Dplatforms=android".to_string(),
        format!("-Dplatform-sdk-version={}", sdk_version),
        "-Dandroid-stub=true".to_string(),
        "-Dgallium-drivers=".to_string(),
        "-Dvulkan-drivers=freedreno".to_string(),
        "-Dfreedreno-kmds=kgsl".to_string(),
        "-Db_lto=true".to_string(),
        "-Dstrip=true".to_string(),
        "-Degl=disabled".to_string(),
    ]
}

/// Drives one cross-build of the checkout
pub struct MesonBuild<'a> {
    pub runner: &'a dyn CommandRunner,
    pub config: &'a BuildConfig,
    pub workdir: &'a Workdir,
}

impl MesonBuild<'_> {
    /// Absolute build directory inside the checkout
    pub fn build_dir(&self) -> PathBuf {
        self.workdir.checkout().join(self.config.arch.build_dir())
    }

    /// Path of the compiled library once ninja finished
    pub fn artifact(&self) -> PathBuf {
        self.build_dir().join(&self.config.artifact)
    }

    /// Write machine files, configure and compile. Returns the artifact path.
    pub async fn run(&self, toolchain: &Toolchain, ctx: &BuildContext) -> BuilderResult<PathBuf> {
        let checkout = self.workdir.checkout();
        let arch = self.config.arch;

        let cross = cross_file(arch, self.config.sdk_version, toolchain)?
            .write(&checkout)
            .await?;
        let native = native_file()?.write(&checkout).await?;
        debug!("Machine files {} and {}", cross.display(), native.display());

        let build_dir = self.build_dir();
        let mut setup = Invocation::new("meson")
            .arg("setup")
            .path_arg(&build_dir)
            .arg("--cross-file")
            .path_arg(&cross)
            .arg("--native-file")
            .path_arg(&native)
            .args(base_options(self.config.sdk_version))
            .args(self.config.extra_options.iter().cloned());
        if build_dir.join("meson-info").is_dir() {
            setup = setup.arg("--reconfigure");
        }

        info!(
            "Configuring {} build of {} for {}",
            ctx.label(),
            ctx.commit_short(),
            arch
        );
        self.runner
            .run_checked(
                &setup
                    .current_dir(&checkout)
                    .log_to(self.workdir.meson_log()),
            )
            .await?;

        info!("Compiling with ninja");
        let ninja = Invocation::new("ninja")
            .arg("-C")
            .path_arg(&build_dir)
            .current_dir(&checkout)
            .log_to(self.workdir.ninja_log());
        self.runner.run_checked(&ninja).await?;

        Ok(self.artifact())
    }
}
