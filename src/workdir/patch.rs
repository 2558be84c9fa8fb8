//! Patch set parsing and application
//!
//! A patch is configured as the descriptor `name;source;args`. `source` is
//! either a reference below the repository's web prefix (`merge_requests/123`,
//! `commit/<sha>`), fetched as `<web_base>/<source>.patch`, or a path to a
//! local `.patch` file. `args` is handed to `git apply` as-is, so
//! `--reverse` turns a patch into a revert.

use crate::error::{BuilderError, BuilderResult};
use crate::fetch::Fetcher;
use crate::process::{CommandRunner, Invocation};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// One entry of the patch set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSpec {
    pub name: String,
    pub source: String,
    pub args: String,
    descriptor: String,
}

/// Where a patch file comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOrigin {
    Remote(String),
    Local(PathBuf),
}

impl PatchSpec {
    /// The descriptor exactly as configured
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Flags for `git apply`
    pub fn apply_args(&self) -> Vec<String> {
        self.args.split_whitespace().map(str::to_string).collect()
    }

    pub fn origin(&self, web_base: &str) -> PatchOrigin {
        if self.source.ends_with(".patch") {
            PatchOrigin::Local(PathBuf::from(&self.source))
        } else {
            PatchOrigin::Remote(format!(
                "{}/{}.patch",
                web_base.trim_end_matches('/'),
                self.source.trim_start_matches('/')
            ))
        }
    }

    /// File name used for the downloaded copy, prefixed by apply order
    fn file_name(&self, index: usize) -> String {
        let safe: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        format!("{:02}-{}.patch", index + 1, safe)
    }
}

impl FromStr for PatchSpec {
    type Err = BuilderError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| BuilderError::InvalidPatch {
            descriptor: descriptor.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = descriptor.splitn(3, ';');
        let name = parts.next().unwrap_or_default().trim();
        let source = parts
            .next()
            .ok_or_else(|| invalid("missing source"))?
            .trim();
        let args = parts.next().unwrap_or_default().trim();

        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if source.is_empty() {
            return Err(invalid("empty source"));
        }

        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            args: args.to_string(),
            descriptor: descriptor.to_string(),
        })
    }
}

impl fmt::Display for PatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

/// Ordered patch set for the patched pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchList {
    patches: Vec<PatchSpec>,
}

impl PatchList {
    /// Experimental patches first, then the configured ones, each group in
    /// its configured order
    pub fn assemble(experimental: &[String], configured: &[String]) -> BuilderResult<Self> {
        let patches = experimental
            .iter()
            .chain(configured)
            .map(|d| d.parse())
            .collect::<BuilderResult<Vec<PatchSpec>>>()?;
        Ok(Self { patches })
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatchSpec> {
        self.patches.iter()
    }

    pub fn to_vec(&self) -> Vec<PatchSpec> {
        self.patches.clone()
    }
}

/// Retrieval and application settings for one patched pass
pub struct PatchApplier<'a> {
    pub runner: &'a dyn CommandRunner,
    pub fetcher: &'a dyn Fetcher,
    pub web_base: &'a str,
    pub download_attempts: u32,
    /// Downloaded patch files land here
    pub patch_dir: PathBuf,
}

impl PatchApplier<'_> {
    /// Retrieve and apply every patch in order; the first failure aborts
    pub async fn apply_all(&self, patches: &PatchList, checkout: &Path) -> BuilderResult<()> {
        tokio::fs::create_dir_all(&self.patch_dir).await.map_err(|e| {
            BuilderError::io(format!("creating {}", self.patch_dir.display()), e)
        })?;

        for (index, patch) in patches.iter().enumerate() {
            let file = self.retrieve(index, patch).await?;

            info!("Applying {} ({})", patch.name, patch.source);
            let apply = Invocation::new("git")
                .arg("apply")
                .args(patch.apply_args())
                .path_arg(&file)
                .current_dir(checkout);
            self.runner.run_checked(&apply).await?;
        }

        Ok(())
    }

    async fn retrieve(&self, index: usize, patch: &PatchSpec) -> BuilderResult<PathBuf> {
        let dest = self.patch_dir.join(patch.file_name(index));
        match patch.origin(self.web_base) {
            PatchOrigin::Remote(url) => {
                self.fetcher
                    .fetch(&url, &dest, self.download_attempts)
                    .await?;
            }
            PatchOrigin::Local(path) => {
                tokio::fs::copy(&path, &dest).await.map_err(|e| {
                    BuilderError::io(format!("copying patch {}", path.display()), e)
                })?;
            }
        }
        Ok(dest)
    }
}
