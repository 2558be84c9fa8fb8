//! Meson machine files
//!
//! Machine files are INI-like: `[section]` headers followed by
//! `key = value` lines where values are single-quoted strings or arrays of
//! them.

use super::TargetArch;
use crate::error::{BuilderError, BuilderResult};
use crate::workdir::Toolchain;
use std::fmt;
use std::path::{Path, PathBuf};

/// Native machine file name
pub const NATIVE_FILE: &str = "native.txt";

/// Flags for the C++ compiler of the cross build
const CPP_FLAGS: [&str; 4] = [
    "-fno-exceptions",
    "-fno-unwind-tables",
    "-fno-asynchronous-unwind-tables",
    "-static-libstdc++",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MesonValue {
    Str(String),
    List(Vec<String>),
}

impl MesonValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    fn strings(&self) -> Vec<&str> {
        match self {
            Self::Str(s) => vec![s.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for MesonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{}'", s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}'", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, MesonValue)>,
}

/// An ordered meson machine file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFile {
    name: String,
    sections: Vec<Section>,
}

impl MachineFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a new section; following entries go into it
    pub fn section(mut self, name: impl Into<String>) -> Self {
        self.sections.push(Section {
            name: name.into(),
            entries: vec![],
        });
        self
    }

    pub fn entry(mut self, key: impl Into<String>, value: MesonValue) -> Self {
        if self.sections.is_empty() {
            self = self.section("binaries");
        }
        if let Some(section) = self.sections.last_mut() {
            section.entries.push((key.into(), value));
        }
        self
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&MesonValue> {
        self.sections
            .iter()
            .filter(|s| s.name == section)
            .flat_map(|s| s.entries.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Every `required` (section, key) is present and no value breaks quoting
    pub fn validate(&self, required: &[(&str, &str)]) -> BuilderResult<()> {
        let invalid = |reason: String| BuilderError::MachineFile {
            name: self.name.clone(),
            reason,
        };

        for (section, key) in required {
            if self.get(section, key).is_none() {
                return Err(invalid(format!("missing {}.{}", section, key)));
            }
        }

        for section in &self.sections {
            for (key, value) in &section.entries {
                let strings = value.strings();
                if strings.is_empty() || strings.iter().any(|s| s.is_empty()) {
                    return Err(invalid(format!("{}.{} is empty", section.name, key)));
                }
                if strings.iter().any(|s| s.contains(['\'', '\n', '\\'])) {
                    return Err(invalid(format!(
                        "{}.{} contains a quote, backslash or newline",
                        section.name, key
                    )));
                }
            }
        }

        Ok(())
    }

    /// Write the rendered file into `dir`, returning its path
    pub async fn write(&self, dir: &Path) -> BuilderResult<PathBuf> {
        let path = dir.join(&self.name);
        tokio::fs::write(&path, self.to_string())
            .await
            .map_err(|e| BuilderError::io(format!("writing {}", path.display()), e))?;
        Ok(path)
    }
}

impl fmt::Display for MachineFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                writeln!(f, "{} = {}", key, value)?;
            }
        }
        Ok(())
    }
}

/// Cross file targeting Android through the NDK's LLVM toolchain
pub fn cross_file(arch: TargetArch, sdk_version: u32, toolchain: &Toolchain) -> BuilderResult<MachineFile> {
    let clang = toolchain.tool(&format!("{}{}-clang", arch.triple(), sdk_version));
    let mut cpp = vec![format!("{}++", clang)];
    cpp.extend(CPP_FLAGS.iter().map(|s| s.to_string()));

    let file = MachineFile::new(arch.cross_file_name())
        .section("binaries")
        .entry("ar", MesonValue::str(toolchain.tool("llvm-ar")))
        .entry("c", MesonValue::list([clang]))
        .entry("cpp", MesonValue::List(cpp))
        .entry("c_ld", MesonValue::str("lld"))
        .entry("cpp_ld", MesonValue::str("lld"))
        .entry("strip", MesonValue::str(toolchain.tool("llvm-strip")))
        .entry(
            "pkg-config",
            MesonValue::list([
                "env".to_string(),
                format!("PKG_CONFIG_LIBDIR={}", toolchain.tool("pkg-config")),
                "/usr/bin/pkg-config".to_string(),
            ]),
        )
        .section("host_machine")
        .entry("system", MesonValue::str("android"))
        .entry("cpu_family", MesonValue::str(arch.cpu_family()))
        .entry("cpu", MesonValue::str(arch.cpu()))
        .entry("endian", MesonValue::str("little"));

    file.validate(&[
        ("binaries", "ar"),
        ("binaries", "c"),
        ("binaries", "cpp"),
        ("binaries", "strip"),
        ("host_machine", "system"),
        ("host_machine", "cpu_family"),
    ])?;
    Ok(file)
}

/// Native file for build-machine helpers compiled during the build
pub fn native_file() -> BuilderResult<MachineFile> {
    let file = MachineFile::new(NATIVE_FILE)
        .section("binaries")
        .entry("c", MesonValue::list(["clang"]))
        .entry("cpp", MesonValue::list(["clang++"]))
        .entry("ar", MesonValue::str("llvm-ar"))
        .entry("strip", MesonValue::str("llvm-strip"))
        .entry("c_ld", MesonValue::str("ld.lld"))
        .entry("cpp_ld", MesonValue::str("ld.lld"))
        .section("build_machine")
        .entry("system", MesonValue::str("linux"))
        .entry("cpu_family", MesonValue::str("x86_64"))
        .entry("cpu", MesonValue::str("x86_64"))
        .entry("endian", MesonValue::str("little"));

    file.validate(&[("binaries", "c"), ("binaries", "cpp")])?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workdir::ToolchainSource;

    fn ndk() -> Toolchain {
        Toolchain::new("/opt/ndk", "linux-x86_64", ToolchainSource::Provisioned)
    }

    #[test]
    fn cross_file_renders_single_quoted() {
        let file = cross_file(TargetArch::Aarch64, 34, &ndk()).unwrap();
        let text = file.to_string();

        assert!(text.starts_with("[binaries]\n"));
        assert!(text.contains(
            "c = ['/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/aarch64-linux-android34-clang']"
        ));
        assert!(text.contains("c_ld = 'lld'"));
        assert!(text.contains("\n[host_machine]\n"));
        assert!(text.contains("cpu = 'armv8'"));
        assert_eq!(file.name(), "android-aarch64.txt");
    }

    #[test]
    fn rendered_files_parse_as_toml() {
        let cross: toml::Table = cross_file(TargetArch::Arm, 30, &ndk())
            .unwrap()
            .to_string()
            .parse()
            .unwrap();
        assert_eq!(cross["host_machine"]["cpu_family"].as_str(), Some("arm"));
        let cpp = cross["binaries"]["cpp"].as_array().unwrap();
        assert!(cpp[0]
            .as_str()
            .unwrap()
            .ends_with("armv7a-linux-androideabi30-clang++"));
        assert_eq!(cpp.len(), 1 + CPP_FLAGS.len());

        let native: toml::Table = native_file().unwrap().to_string().parse().unwrap();
        assert_eq!(native["build_machine"]["system"].as_str(), Some("linux"));
    }

    #[test]
    fn validate_rejects_missing_and_unquotable() {
        let file = MachineFile::new("x.txt")
            .section("binaries")
            .entry("c", MesonValue::str("cl'ang"));
        assert!(file.validate(&[]).is_err());

        let file = MachineFile::new("x.txt").entry("c", MesonValue::str("clang"));
        let err = file.validate(&[("binaries", "cpp")]).unwrap_err();
        assert!(err.to_string().contains("missing binaries.cpp"));

        let empty = MachineFile::new("x.txt").entry("c", MesonValue::List(vec![]));
        assert!(empty.validate(&[]).is_err());
    }
}
