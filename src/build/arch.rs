//! Android target architectures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of architectures the driver is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetArch {
    /// 64-bit ARM
    Aarch64,
    /// 32-bit ARM
    Arm,
}

impl TargetArch {
    pub const ALL: [TargetArch; 2] = [TargetArch::Aarch64, TargetArch::Arm];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
        }
    }

    /// Clang target triple prefix, without the API level
    pub fn triple(&self) -> &'static str {
        match self {
            Self::Aarch64 => "aarch64-linux-android",
            Self::Arm => "armv7a-linux-androideabi",
        }
    }

    pub fn cpu_family(&self) -> &'static str {
        match self {
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
        }
    }

    pub fn cpu(&self) -> &'static str {
        match self {
            Self::Aarch64 => "armv8",
            Self::Arm => "armv7",
        }
    }

    /// `build-android-<arch>`
    pub fn build_dir(&self) -> String {
        format!("build-android-{}", self.name())
    }

    /// `android-<arch>.txt`
    pub fn cross_file_name(&self) -> String {
        format!("android-{}.txt", self.name())
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "arm" | "arm32" => Ok(Self::Arm),
            other => Err(format!("unsupported architecture '{}'", other)),
        }
    }
}
