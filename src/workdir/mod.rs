//! Working directory preparation
//!
//! A pass starts here: the workdir is created, the NDK provisioned and the
//! Mesa checkout brought to the state the pass builds. The first pass always
//! starts from a fresh clone; the patched pass reuses that checkout, syncs it
//! with upstream and applies the patch set on top.

pub mod patch;
pub mod source;
pub mod toolchain;

pub use patch::{PatchApplier, PatchList, PatchOrigin, PatchSpec};
pub use source::{SourceRevision, SyncOutcome};
pub use toolchain::{Toolchain, ToolchainSource};

use crate::cache::ToolchainCache;
use crate::config::{Config, HostEnv};
use crate::context::BuildContext;
use crate::error::{BuilderError, BuilderResult};
use crate::fetch::Fetcher;
use crate::process::CommandRunner;
use std::path::{Path, PathBuf};
use tracing::info;

const PATCH_DIR: &str = "patches";
const MESON_LOG: &str = "meson_log";
const NINJA_LOG: &str = "ninja_log";

/// Layout of the working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workdir {
    root: PathBuf,
    checkout_dir: String,
    package_dir: String,
}

impl Workdir {
    /// Create the directory and resolve it to an absolute path
    pub async fn init(root: &Path, config: &Config) -> BuilderResult<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| BuilderError::io(format!("creating workdir {}", root.display()), e))?;
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| BuilderError::io(format!("resolving workdir {}", root.display()), e))?;

        Ok(Self {
            root,
            checkout_dir: config.source.checkout_dir.clone(),
            package_dir: config.package.package_dir.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkout(&self) -> PathBuf {
        self.root.join(&self.checkout_dir)
    }

    pub fn patches(&self) -> PathBuf {
        self.root.join(PATCH_DIR)
    }

    pub fn package(&self) -> PathBuf {
        self.root.join(&self.package_dir)
    }

    pub fn meson_log(&self) -> PathBuf {
        self.root.join(MESON_LOG)
    }

    pub fn ninja_log(&self) -> PathBuf {
        self.root.join(NINJA_LOG)
    }
}

/// Prepares the workdir for each pass
pub struct Preparer<'a> {
    pub config: &'a Config,
    pub env: &'a HostEnv,
    pub workdir: &'a Workdir,
    pub runner: &'a dyn CommandRunner,
    pub fetcher: &'a dyn Fetcher,
    pub cache: &'a ToolchainCache,
}

impl Preparer<'_> {
    /// Toolchain plus a fresh clone of the configured branch
    pub async fn first_pass(&self) -> BuilderResult<(Toolchain, BuildContext)> {
        let toolchain = self.toolchain().await?;

        info!("Cloning {} ({})", self.config.source.repository, self.config.source.branch);
        let revision =
            source::fresh_clone(self.runner, &self.config.source, &self.workdir.checkout()).await?;

        Ok((
            toolchain,
            BuildContext::unpatched(revision, self.workdir.root()),
        ))
    }

    /// Reuse the checkout of `previous`, sync it and apply `patches`
    pub async fn patched_pass(
        &self,
        previous: &BuildContext,
        patches: &PatchList,
    ) -> BuilderResult<(Toolchain, BuildContext)> {
        let toolchain = self.toolchain().await?;
        let checkout = self.workdir.checkout();

        let (revision, outcome) =
            source::sync_upstream(self.runner, &self.config.source, &checkout, &previous.revision)
                .await?;
        if let SyncOutcome::Advanced { ref to, .. } = outcome {
            info!("Patched pass builds upstream {}", to);
        }

        info!("Applying {} patch(es)", patches.len());
        let applier = PatchApplier {
            runner: self.runner,
            fetcher: self.fetcher,
            web_base: &self.config.source.web_base,
            download_attempts: self.config.patches.download_attempts,
            patch_dir: self.workdir.patches(),
        };
        applier.apply_all(patches, &checkout).await?;

        Ok((
            toolchain,
            BuildContext::patched(revision, self.workdir.root(), patches.to_vec()),
        ))
    }

    async fn toolchain(&self) -> BuilderResult<Toolchain> {
        toolchain::provision(
            &self.config.toolchain,
            self.env,
            self.workdir.root(),
            self.cache,
            self.fetcher,
            self.runner,
        )
        .await
    }
}
