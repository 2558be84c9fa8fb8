//! Per-pass build context

use crate::workdir::{PatchSpec, SourceRevision};
use std::path::PathBuf;

/// Everything the build and packaging stages know about one pass.
///
/// Created by the workdir preparer once the source step completes and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub revision: SourceRevision,
    pub workdir: PathBuf,
    pub patched: bool,
    pub applied_patches: Vec<PatchSpec>,
}

impl BuildContext {
    pub fn unpatched(revision: SourceRevision, workdir: impl Into<PathBuf>) -> Self {
        Self {
            revision,
            workdir: workdir.into(),
            patched: false,
            applied_patches: vec![],
        }
    }

    pub fn patched(
        revision: SourceRevision,
        workdir: impl Into<PathBuf>,
        applied_patches: Vec<PatchSpec>,
    ) -> Self {
        Self {
            revision,
            workdir: workdir.into(),
            patched: true,
            applied_patches,
        }
    }

    pub fn commit(&self) -> &str {
        &self.revision.commit
    }

    pub fn commit_short(&self) -> &str {
        &self.revision.commit_short
    }

    /// `<source version>/vk<major>.<minor>.<patch>`
    pub fn driver_version(&self) -> String {
        format!("{}/vk{}", self.revision.version, self.revision.vulkan)
    }

    /// `_patched` for the patched pass, empty otherwise
    pub fn suffix(&self) -> &'static str {
        if self.patched {
            "_patched"
        } else {
            ""
        }
    }

    pub fn label(&self) -> &'static str {
        if self.patched {
            "patched"
        } else {
            "unpatched"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn revision() -> SourceRevision {
        SourceRevision {
            commit: "0123456789abcdef0123456789abcdef01234567".to_string(),
            commit_short: "0123456".to_string(),
            version: "25.1.0-devel".to_string(),
            vulkan: Version::new(1, 4, 303),
        }
    }

    #[test]
    fn driver_version_format() {
        let ctx = BuildContext::unpatched(revision(), "/work");
        assert_eq!(ctx.driver_version(), "25.1.0-devel/vk1.4.303");
    }

    #[test]
    fn suffix_follows_pass() {
        let plain = BuildContext::unpatched(revision(), "/work");
        assert_eq!(plain.suffix(), "");
        assert!(plain.applied_patches.is_empty());

        let patch = "a;commit/aa;".parse().unwrap();
        let patched = BuildContext::patched(revision(), "/work", vec![patch]);
        assert_eq!(patched.suffix(), "_patched");
        assert_eq!(patched.label(), "patched");
    }
}
