//! Configuration schema for turnip-builder
//!
//! Configuration is read from `turnip.toml` in the current directory or
//! `~/.config/turnip-builder/config.toml`. Every section has defaults, so an
//! empty file reproduces the stock Turnip build.

use crate::build::TargetArch;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Required host tools
    pub dependencies: DependenciesConfig,

    /// Android NDK settings
    pub toolchain: ToolchainConfig,

    /// Upstream Mesa repository
    pub source: SourceConfig,

    /// Cross-build settings
    pub build: BuildConfig,

    /// Driver package settings
    pub package: PackageConfig,

    /// Patch set
    pub patches: PatchesConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Work directory holding every transient and output file of a run
    pub workdir: PathBuf,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("turnip_workdir"),
            log_format: "text".to_string(),
        }
    }
}

/// Host tool requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    /// Tools that must resolve on PATH before anything else runs
    pub required: Vec<String>,

    /// Try `pip install` for the python packages before checking
    pub remediate: bool,

    /// Python packages needed by the Mesa build
    pub python_packages: Vec<String>,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            required: ["meson", "ninja", "patchelf", "unzip", "pip", "flex", "bison", "zip", "git"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            remediate: true,
            python_packages: vec!["mako".to_string()],
        }
    }
}

/// Android NDK configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// NDK release, also the cache key (e.g. "android-ndk-r28")
    pub version: String,

    /// Base URL the `<version>-linux.zip` archive is downloaded from
    pub download_base: String,

    /// Prebuilt host directory inside the NDK
    pub host_tag: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            version: "android-ndk-r28".to_string(),
            download_base: "https://dl.google.com/android/repository".to_string(),
            host_tag: "linux-x86_64".to_string(),
        }
    }
}

/// Upstream source repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Git URL to clone
    pub repository: String,

    /// Branch to build
    pub branch: String,

    /// Web prefix for commit links and `<source>.patch` downloads
    pub web_base: String,

    /// Checkout directory name under the workdir
    pub checkout_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: "https://gitlab.freedesktop.org/mesa/mesa.git".to_string(),
            branch: "main".to_string(),
            web_base: "https://gitlab.freedesktop.org/mesa/mesa/-".to_string(),
            checkout_dir: "mesa".to_string(),
        }
    }
}

/// Cross-build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Target architecture
    pub arch: TargetArch,

    /// Android platform SDK level the driver is compiled against
    pub sdk_version: u32,

    /// Extra `-D` options appended after the built-in meson options
    pub extra_options: Vec<String>,

    /// Compiled library path relative to the build directory
    pub artifact: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            arch: TargetArch::Aarch64,
            sdk_version: 34,
            extra_options: vec![],
            artifact: PathBuf::from("src/freedreno/vulkan/libvulkan_freedreno.so"),
        }
    }
}

/// Driver package configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Package directory name under the workdir
    pub package_dir: String,

    /// Soname written into the library
    pub soname: String,

    /// Distribution filename of the library
    pub library_name: String,

    /// Display name prefix for the package and archive
    pub display_name: String,

    /// Metadata author
    pub author: String,

    /// Metadata vendor
    pub vendor: String,

    /// Metadata package version
    pub package_version: String,

    /// Lowest Android API level the package loads on
    pub min_api: u32,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            package_dir: "turnip_module".to_string(),
            soname: "vulkan.adreno.so".to_string(),
            library_name: "vulkan.turnip.so".to_string(),
            display_name: "Turnip".to_string(),
            author: "mesa".to_string(),
            vendor: "Mesa".to_string(),
            package_version: "1".to_string(),
            min_api: 27,
        }
    }
}

/// Patch set configuration
///
/// Entries use the descriptor form `name;source;args`, where `source` is a
/// `merge_requests/<id>` or `commit/<sha>` reference below `source.web_base`
/// or a path to a local `.patch` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchesConfig {
    /// Patches applied on the patched pass, in order
    pub apply: Vec<String>,

    /// Patches prepended to `apply` on the patched pass
    pub experimental: Vec<String>,

    /// Attempts per patch download
    pub download_attempts: u32,

    /// Seconds between download attempts
    pub retry_delay_secs: u64,
}

impl Default for PatchesConfig {
    fn default() -> Self {
        Self {
            apply: vec![],
            experimental: vec![],
            download_attempts: 5,
            retry_delay_secs: 30,
        }
    }
}
