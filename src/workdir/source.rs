//! Upstream Mesa checkout and version discovery

use crate::config::schema::SourceConfig;
use crate::error::{BuilderError, BuilderResult};
use crate::process::{CommandRunner, Invocation};
use semver::Version;
use std::path::Path;
use tracing::{info, warn};

/// Mesa release string, e.g. `25.1.0-devel`
pub const VERSION_FILE: &str = "VERSION";

/// Vendored Vulkan header carrying the API version markers
pub const VULKAN_HEADER: &str = "include/vulkan/vulkan_core.h";

const COMPLETE_MARKER: &str = "#define VK_HEADER_VERSION_COMPLETE";
const PATCH_MARKER: &str = "#define VK_HEADER_VERSION ";

/// Identity of a checked-out source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRevision {
    pub commit: String,
    pub commit_short: String,
    pub version: String,
    pub vulkan: Version,
}

/// What the upstream sync of a repeat pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Advanced { from: String, to: String },
}

/// Delete any previous checkout and shallow-clone the configured branch
pub async fn fresh_clone(
    runner: &dyn CommandRunner,
    config: &SourceConfig,
    checkout: &Path,
) -> BuilderResult<SourceRevision> {
    if checkout.exists() {
        info!("Removing previous checkout {}", checkout.display());
        tokio::fs::remove_dir_all(checkout)
            .await
            .map_err(|e| BuilderError::io(format!("removing {}", checkout.display()), e))?;
    }

    let mut clone = Invocation::new("git")
        .args(["clone", "--depth=1", "-b"])
        .arg(config.branch.as_str())
        .arg(config.repository.as_str())
        .path_arg(checkout);
    if let Some(parent) = checkout.parent() {
        clone = clone.current_dir(parent);
    }
    runner.run_checked(&clone).await?;

    read_revision(runner, checkout).await
}

/// Fetch upstream and merge it into the checkout if it moved.
///
/// The returned revision carries the new HEAD when upstream advanced, so a
/// patched pass can end up on a newer commit than the unpatched pass.
pub async fn sync_upstream(
    runner: &dyn CommandRunner,
    config: &SourceConfig,
    checkout: &Path,
    recorded: &SourceRevision,
) -> BuilderResult<(SourceRevision, SyncOutcome)> {
    let fetch = Invocation::new("git")
        .args(["fetch", "origin"])
        .arg(config.branch.as_str())
        .current_dir(checkout);
    runner.run_checked(&fetch).await?;

    let upstream = git_stdout(runner, checkout, &["rev-parse", "FETCH_HEAD"]).await?;
    if upstream == recorded.commit {
        return Ok((recorded.clone(), SyncOutcome::Unchanged));
    }

    warn!(
        "Upstream advanced from {} to {}, merging before patching",
        recorded.commit_short, upstream
    );
    let merge = Invocation::new("git")
        .args(["merge", "--no-edit", "FETCH_HEAD"])
        .current_dir(checkout);
    runner.run_checked(&merge).await?;

    let revision = read_revision(runner, checkout).await?;
    let outcome = SyncOutcome::Advanced {
        from: recorded.commit.clone(),
        to: revision.commit.clone(),
    };
    Ok((revision, outcome))
}

/// Record HEAD and the version markers of a checkout
pub async fn read_revision(
    runner: &dyn CommandRunner,
    checkout: &Path,
) -> BuilderResult<SourceRevision> {
    let commit = git_stdout(runner, checkout, &["rev-parse", "HEAD"]).await?;
    let commit_short = git_stdout(runner, checkout, &["rev-parse", "--short", "HEAD"]).await?;

    let version_path = checkout.join(VERSION_FILE);
    let contents = read(&version_path).await?;
    let version = parse_source_version(&contents)
        .ok_or_else(|| BuilderError::source_parse(&version_path, "file is empty"))?;

    let header_path = checkout.join(VULKAN_HEADER);
    let header = read(&header_path).await?;
    let vulkan = parse_vulkan_version(&header)
        .map_err(|reason| BuilderError::source_parse(&header_path, reason))?;

    info!("Source {} ({}), Vulkan {}", version, commit_short, vulkan);
    Ok(SourceRevision {
        commit,
        commit_short,
        version,
        vulkan,
    })
}

async fn git_stdout(
    runner: &dyn CommandRunner,
    checkout: &Path,
    args: &[&str],
) -> BuilderResult<String> {
    let inv = Invocation::new("git")
        .args(args.iter().copied())
        .current_dir(checkout);
    Ok(runner.run_checked(&inv).await?.trimmed().to_string())
}

async fn read(path: &Path) -> BuilderResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BuilderError::io(format!("reading {}", path.display()), e))
}

/// First non-blank line of the VERSION file
pub fn parse_source_version(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Vulkan API version from the vendored header.
///
/// Major and minor come from
/// `#define VK_HEADER_VERSION_COMPLETE VK_MAKE_API_VERSION(0, 1, 4, VK_HEADER_VERSION)`,
/// the patch level from `#define VK_HEADER_VERSION 303`.
pub fn parse_vulkan_version(header: &str) -> Result<Version, String> {
    let complete = header
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix(COMPLETE_MARKER))
        .ok_or_else(|| "VK_HEADER_VERSION_COMPLETE not found".to_string())?;

    let args = complete
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| format!("malformed VK_HEADER_VERSION_COMPLETE: {}", complete.trim()))?;

    let fields: Vec<&str> = args.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 version fields, found {}", fields.len()));
    }
    let major = parse_field(fields[1], "major")?;
    let minor = parse_field(fields[2], "minor")?;

    let patch = header
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix(PATCH_MARKER))
        .ok_or_else(|| "VK_HEADER_VERSION not found".to_string())
        .and_then(|v| parse_field(v.trim(), "patch"))?;

    Ok(Version::new(major, minor, patch))
}

fn parse_field(value: &str, what: &str) -> Result<u64, String> {
    value
        .parse()
        .map_err(|_| format!("{} version '{}' is not a number", what, value))
}
