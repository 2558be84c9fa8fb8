//! Driver package descriptor (`meta.json`)

use super::BuildDate;
use crate::config::schema::PackageConfig;
use crate::context::BuildContext;
use crate::error::{BuilderError, BuilderResult};
use serde::{Deserialize, Serialize};

pub const METADATA_FILE: &str = "meta.json";

/// Descriptor format understood by driver loaders
pub const SCHEMA_VERSION: u32 = 1;

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub schema_version: u32,
    pub name: String,
    pub description: String,
    pub author: String,
    pub package_version: String,
    pub vendor: String,
    pub driver_version: String,
    pub min_api: u32,
    pub library_name: String,
}

impl ArtifactMetadata {
    pub fn for_build(ctx: &BuildContext, config: &PackageConfig, date: &BuildDate) -> Self {
        let short = ctx.commit_short();
        let suffix = ctx.suffix();
        Self {
            schema_version: SCHEMA_VERSION,
            name: format!("{} - {} - {}{}", config.display_name, date.label(), short, suffix),
            description: format!("Compiled from Mesa, Commit {}{}", short, suffix),
            author: config.author.clone(),
            package_version: config.package_version.clone(),
            vendor: config.vendor.clone(),
            driver_version: ctx.driver_version(),
            min_api: config.min_api,
            library_name: config.library_name.clone(),
        }
    }

    pub fn validate(&self) -> BuilderResult<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(BuilderError::MetadataInvalid(format!(
                "unsupported schemaVersion {}",
                self.schema_version
            )));
        }

        let required = [
            ("name", &self.name),
            ("description", &self.description),
            ("author", &self.author),
            ("packageVersion", &self.package_version),
            ("vendor", &self.vendor),
            ("driverVersion", &self.driver_version),
            ("libraryName", &self.library_name),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(BuilderError::MetadataInvalid(format!("{} is empty", field)));
        }

        if !self.library_name.ends_with(".so") || self.library_name.contains('/') {
            return Err(BuilderError::MetadataInvalid(format!(
                "libraryName '{}' must be a bare .so file name",
                self.library_name
            )));
        }
        if !self.driver_version.contains("/vk") {
            return Err(BuilderError::MetadataInvalid(format!(
                "driverVersion '{}' lacks the Vulkan API version",
                self.driver_version
            )));
        }

        Ok(())
    }

    pub fn to_json(&self) -> BuilderResult<String> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }
}
