//! turnip-builder - Turnip Vulkan driver build automation
//!
//! Clones Mesa, cross-compiles the Turnip driver for Android with meson and
//! the NDK, and packages the library as a loadable driver archive. External
//! tools do the heavy lifting; this crate sequences them.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod deps;
pub mod error;
pub mod fetch;
pub mod package;
pub mod pipeline;
pub mod process;
pub mod ui;
pub mod workdir;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BuilderError, BuilderResult};
