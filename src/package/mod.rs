//! Driver packaging
//!
//! Turns the compiled library into a loadable driver package: the soname is
//! rewritten, the library renamed, a `meta.json` descriptor generated and
//! both zipped into an archive at the workdir root, with release-note
//! sidecars and a checksum beside it.

pub mod metadata;
pub mod sidecars;

pub use metadata::{ArtifactMetadata, METADATA_FILE};
pub use sidecars::Sidecars;

use crate::config::schema::PackageConfig;
use crate::context::BuildContext;
use crate::error::{BuilderError, BuilderResult};
use crate::process::{CommandRunner, Invocation};
use crate::workdir::Workdir;
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Calendar date stamped into names and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildDate(NaiveDate);

impl BuildDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// `Mar 07, 2025`
    pub fn label(&self) -> String {
        self.0.format("%b %d, %Y").to_string()
    }

    /// `Mar-07-2025`, used in file names
    pub fn stamp(&self) -> String {
        self.0.format("%b-%d-%Y").to_string()
    }
}

/// Files produced by one packaging pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    pub archive: PathBuf,
    pub checksum: String,
    pub metadata: ArtifactMetadata,
}

pub struct Packager<'a> {
    pub runner: &'a dyn CommandRunner,
    pub config: &'a PackageConfig,
    pub web_base: &'a str,
    pub workdir: &'a Workdir,
}

impl Packager<'_> {
    /// `<name>_<date>_<short><suffix>.zip`
    pub fn archive_name(&self, ctx: &BuildContext, date: &BuildDate) -> String {
        format!(
            "{}_{}_{}{}.zip",
            self.config.display_name.to_lowercase(),
            date.stamp(),
            ctx.commit_short(),
            ctx.suffix()
        )
    }

    pub async fn package(
        &self,
        artifact: &Path,
        ctx: &BuildContext,
        date: &BuildDate,
    ) -> BuilderResult<PackageOutput> {
        let root = self.workdir.root();
        let library = self.retag(artifact).await?;

        let package_dir = self.workdir.package();
        if package_dir.exists() {
            fs::remove_dir_all(&package_dir)
                .await
                .map_err(|e| BuilderError::io(format!("removing {}", package_dir.display()), e))?;
        }
        fs::create_dir_all(&package_dir)
            .await
            .map_err(|e| BuilderError::io(format!("creating {}", package_dir.display()), e))?;

        let metadata = ArtifactMetadata::for_build(ctx, self.config, date);
        let meta_path = package_dir.join(METADATA_FILE);
        fs::write(&meta_path, metadata.to_json()?)
            .await
            .map_err(|e| BuilderError::io(format!("writing {}", meta_path.display()), e))?;

        let packaged = package_dir.join(&self.config.library_name);
        fs::copy(&library, &packaged)
            .await
            .map_err(|e| BuilderError::io(format!("copying {}", library.display()), e))?;

        let archive_name = self.archive_name(ctx, date);
        let archive = root.join(&archive_name);
        info!("Packing {}", archive_name);
        let zip = Invocation::new("zip")
            .arg("-9")
            .path_arg(&archive)
            .arg(METADATA_FILE)
            .arg(self.config.library_name.as_str())
            .current_dir(&package_dir);
        self.runner.run_checked(&zip).await?;

        Sidecars::for_build(ctx, &self.config.display_name, self.web_base, &archive_name, date)
            .write(root)
            .await?;

        if !archive.is_file() {
            return Err(BuilderError::ArchiveMissing(archive));
        }
        let checksum = write_checksum(&archive).await?;
        info!("Package ready in {}", root.display());

        Ok(PackageOutput {
            archive,
            checksum,
            metadata,
        })
    }

    /// Copy the artifact out of the build tree, set its soname and rename it
    async fn retag(&self, artifact: &Path) -> BuilderResult<PathBuf> {
        let root = self.workdir.root();
        if !artifact.is_file() {
            return Err(BuilderError::ArtifactMissing(artifact.to_path_buf()));
        }
        let file_name = artifact
            .file_name()
            .ok_or_else(|| BuilderError::ArtifactMissing(artifact.to_path_buf()))?;
        let copied = root.join(file_name);
        fs::copy(artifact, &copied)
            .await
            .map_err(|e| BuilderError::io(format!("copying {}", artifact.display()), e))?;

        let patchelf = Invocation::new("patchelf")
            .arg("--set-soname")
            .arg(self.config.soname.as_str())
            .path_arg(&copied)
            .current_dir(root);
        self.runner.run_checked(&patchelf).await?;

        let library = root.join(&self.config.library_name);
        if copied != library {
            fs::rename(&copied, &library)
                .await
                .map_err(|e| BuilderError::io(format!("renaming {}", copied.display()), e))?;
        }
        if !library.is_file() {
            return Err(BuilderError::ArtifactMissing(library));
        }
        debug!("Retagged library at {}", library.display());
        Ok(library)
    }
}

/// Write `<archive>.sha256` in `sha256sum` format; returns the hex digest
pub async fn write_checksum(archive: &Path) -> BuilderResult<String> {
    let bytes = fs::read(archive)
        .await
        .map_err(|e| BuilderError::io(format!("reading {}", archive.display()), e))?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut sidecar = archive.as_os_str().to_owned();
    sidecar.push(".sha256");
    let sidecar = PathBuf::from(sidecar);
    fs::write(&sidecar, format!("{}  {}\n", digest, name))
        .await
        .map_err(|e| BuilderError::io(format!("writing {}", sidecar.display()), e))?;

    Ok(digest)
}
