//! Error types for turnip-builder
//!
//! All modules use `BuilderResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for builder operations
pub type BuilderResult<T> = Result<T, BuilderError>;

/// All errors that can occur while building a driver package
#[derive(Error, Debug)]
pub enum BuilderError {
    // Environment errors
    #[error("Required tools not found: {}", missing.join(", "))]
    MissingDependencies { missing: Vec<String> },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid patch descriptor '{descriptor}': {reason}")]
    InvalidPatch { descriptor: String, reason: String },

    // Network errors
    #[error("Download failed after {attempts} attempt(s): {url}: {reason}")]
    Download {
        url: String,
        attempts: u32,
        reason: String,
    },

    // Source tree errors
    #[error("Could not parse {file}: {reason}")]
    SourceParse { file: PathBuf, reason: String },

    // Build errors
    #[error("Invalid machine file {name}: {reason}")]
    MachineFile { name: String, reason: String },

    // Packaging errors
    #[error("Build failed! Compiled artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("Packaging failed! Archive not found: {0}")]
    ArchiveMissing(PathBuf),

    #[error("Invalid driver metadata: {0}")]
    MetadataInvalid(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {}\n{output}", code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)))]
    ToolFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuilderError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error (the process could not be spawned)
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a source parse error
    pub fn source_parse(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceParse {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from the network rather than the local machine
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Download { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingDependencies { .. } => {
                Some("Install the missing tools and re-run (see `turnip-builder check`)")
            }
            Self::ToolFailed { command, .. }
                if command.starts_with("meson") || command.starts_with("ninja") =>
            {
                Some("Inspect meson_log and ninja_log in the work directory")
            }
            Self::ArtifactMissing(_) => Some("Inspect ninja_log in the work directory"),
            Self::Download { .. } => Some("Check network access to the download host"),
            Self::InvalidPatch { .. } => Some("Patch descriptors use the form name;source;args"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dependencies_lists_every_tool() {
        let err = BuilderError::MissingDependencies {
            missing: vec!["meson".to_string(), "patchelf".to_string()],
        };
        assert_eq!(err.to_string(), "Required tools not found: meson, patchelf");
        assert!(err.hint().is_some());
    }

    #[test]
    fn tool_failed_display() {
        let err = BuilderError::ToolFailed {
            command: "ninja -C build-android-aarch64".to_string(),
            code: Some(1),
            output: "FAILED: src/foo.o".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exited with code 1"));
        assert!(msg.contains("FAILED: src/foo.o"));
        assert_eq!(
            err.hint(),
            Some("Inspect meson_log and ninja_log in the work directory")
        );
    }

    #[test]
    fn tool_failed_by_signal() {
        let err = BuilderError::ToolFailed {
            command: "git apply".to_string(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("exited with a signal"));
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn network_classification() {
        let err = BuilderError::Download {
            url: "https://example.invalid/x.patch".to_string(),
            attempts: 5,
            reason: "timeout".to_string(),
        };
        assert!(err.is_network());
        assert!(!BuilderError::Internal("x".to_string()).is_network());
    }
}
