//! Android NDK provisioning

use crate::cache::ToolchainCache;
use crate::config::schema::ToolchainConfig;
use crate::config::HostEnv;
use crate::error::{BuilderError, BuilderResult};
use crate::fetch::Fetcher;
use crate::process::{CommandRunner, Invocation};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Cache entry name for NDK archives
pub const CACHE_NAME: &str = "ndk";

/// The NDK archive download is not retried
const DOWNLOAD_ATTEMPTS: u32 = 1;

/// Where the toolchain came from, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainSource {
    /// Pre-installed on the host
    Provisioned,
    /// Extracted by an earlier pass or run
    Extracted,
    /// Restored from the cache and extracted
    Cached,
    /// Downloaded and extracted
    Downloaded,
}

/// An NDK install with the LLVM prebuilt layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    root: PathBuf,
    host_tag: String,
    pub source: ToolchainSource,
}

impl Toolchain {
    pub fn new(root: impl Into<PathBuf>, host_tag: impl Into<String>, source: ToolchainSource) -> Self {
        Self {
            root: root.into(),
            host_tag: host_tag.into(),
            source,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<ndk>/toolchains/llvm/prebuilt/<host>/bin`
    pub fn llvm_bin(&self) -> PathBuf {
        self.root
            .join("toolchains")
            .join("llvm")
            .join("prebuilt")
            .join(&self.host_tag)
            .join("bin")
    }

    /// Absolute path of a tool in the LLVM bin directory
    pub fn tool(&self, name: &str) -> String {
        self.llvm_bin().join(name).to_string_lossy().into_owned()
    }
}

/// Make an NDK available, in order of preference: pre-provisioned on the
/// host, already extracted in the workdir, restored from cache, downloaded.
/// A cached archive that fails to unpack is discarded in favor of a download.
pub async fn provision(
    config: &ToolchainConfig,
    env: &HostEnv,
    workdir: &Path,
    cache: &ToolchainCache,
    fetcher: &dyn Fetcher,
    runner: &dyn CommandRunner,
) -> BuilderResult<Toolchain> {
    if let Some(ref home) = env.ndk_home {
        info!("Using pre-provisioned NDK at {}", home.display());
        return Ok(Toolchain::new(home, &config.host_tag, ToolchainSource::Provisioned));
    }

    let extracted = workdir.join(&config.version);
    if extracted.is_dir() {
        debug!("Reusing extracted NDK at {}", extracted.display());
        return Ok(Toolchain::new(extracted, &config.host_tag, ToolchainSource::Extracted));
    }

    let archive = workdir.join(archive_name(&config.version));
    if let Some(matched) = cache.restore(CACHE_NAME, &config.version, &archive).await {
        // A prefix hit unpacks under its own version name
        let root = workdir.join(&matched);
        match unzip(runner, &archive, workdir).await {
            Ok(()) if root.is_dir() => {
                return Ok(Toolchain::new(root, &config.host_tag, ToolchainSource::Cached));
            }
            Ok(()) => warn!(
                "Cached archive for {} did not unpack to {}, downloading instead",
                config.version,
                root.display()
            ),
            Err(e) => warn!("Extracting cached {} failed, downloading instead: {}", matched, e),
        }
        let _ = fs::remove_file(&archive).await;
    }

    let url = download_url(config);
    info!("Downloading {}", url);
    fetcher.fetch(&url, &archive, DOWNLOAD_ATTEMPTS).await?;
    cache.save(CACHE_NAME, &config.version, &archive).await;
    unzip(runner, &archive, workdir).await?;

    if !extracted.is_dir() {
        return Err(BuilderError::Internal(format!(
            "{} did not contain {}",
            archive.display(),
            config.version
        )));
    }

    Ok(Toolchain::new(extracted, &config.host_tag, ToolchainSource::Downloaded))
}

async fn unzip(runner: &dyn CommandRunner, archive: &Path, dest: &Path) -> BuilderResult<()> {
    let invocation = Invocation::new("unzip")
        .args(["-q", "-o"])
        .path_arg(archive)
        .arg("-d")
        .path_arg(dest)
        .current_dir(dest);
    runner.run_checked(&invocation).await?;
    Ok(())
}

/// `<version>-linux.zip`
pub fn archive_name(version: &str) -> String {
    format!("{}-linux.zip", version)
}

pub fn download_url(config: &ToolchainConfig) -> String {
    format!(
        "{}/{}",
        config.download_base.trim_end_matches('/'),
        archive_name(&config.version)
    )
}
