//! Host environment captured once at startup
//!
//! Stages never read process environment variables directly; they receive a
//! `HostEnv` so tests can describe any environment without touching globals.

use std::ffi::OsString;
use std::path::PathBuf;

/// Pre-provisioned NDK (set on GitHub-hosted runners)
pub const NDK_HOME_VAR: &str = "ANDROID_NDK_LATEST_HOME";

/// Workspace root marker; its presence enables the toolchain cache
pub const CACHE_ROOT_VAR: &str = "GITHUB_WORKSPACE";

/// Overrides where cached toolchain archives are stored
pub const CACHE_DIR_VAR: &str = "TURNIP_CACHE_DIR";

/// Relevant environment of the build host
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    /// Pre-provisioned NDK root
    pub ndk_home: Option<PathBuf>,
    /// Cache root marker
    pub cache_root: Option<PathBuf>,
    /// Cache store override
    pub cache_dir: Option<PathBuf>,
    /// Search path used for dependency probing
    pub path: Option<OsString>,
}

impl HostEnv {
    /// Read the environment of the current process
    pub fn capture() -> Self {
        Self {
            ndk_home: non_empty_path(NDK_HOME_VAR),
            cache_root: non_empty_path(CACHE_ROOT_VAR),
            cache_dir: non_empty_path(CACHE_DIR_VAR),
            path: std::env::var_os("PATH"),
        }
    }
}

fn non_empty_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
