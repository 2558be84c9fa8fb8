//! Release-note files written next to the archive

use super::BuildDate;
use crate::context::BuildContext;
use crate::error::{BuilderError, BuilderResult};
use std::path::Path;

/// Sidecar file contents for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidecars {
    pub release: String,
    pub tag: String,
    pub filename: String,
    pub description: String,
    pub patched: bool,
}

impl Sidecars {
    pub fn for_build(
        ctx: &BuildContext,
        display_name: &str,
        web_base: &str,
        archive_name: &str,
        date: &BuildDate,
    ) -> Self {
        let version = &ctx.revision.version;
        Self {
            release: format!("{} - {} - {}", display_name, version, date.label()),
            tag: format!("{}_{}", version, ctx.commit_short()),
            filename: archive_name.to_string(),
            description: description(ctx, web_base),
            patched: ctx.patched,
        }
    }

    /// Write `release`, `tag`, `filename`, `description` and `patched` into `dir`
    pub async fn write(&self, dir: &Path) -> BuilderResult<()> {
        let files = [
            ("release", self.release.clone()),
            ("tag", self.tag.clone()),
            ("filename", self.filename.clone()),
            ("description", self.description.clone()),
            ("patched", self.patched.to_string()),
        ];
        for (name, contents) in files {
            let path = dir.join(name);
            tokio::fs::write(&path, contents)
                .await
                .map_err(|e| BuilderError::io(format!("writing {}", path.display()), e))?;
        }
        Ok(())
    }
}

/// Base commit link, then `No patch` or one `- <descriptor>` line per patch
pub fn description(ctx: &BuildContext, web_base: &str) -> String {
    let mut lines = vec![format!(
        "Compiled from Mesa, base commit: {}/commit/{}",
        web_base.trim_end_matches('/'),
        ctx.commit()
    )];
    if ctx.applied_patches.is_empty() {
        lines.push("No patch".to_string());
    } else {
        lines.extend(
            ctx.applied_patches
                .iter()
                .map(|p| format!("- {}", p.descriptor())),
        );
    }
    lines.join("\n")
}
