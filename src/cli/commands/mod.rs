//! CLI command implementations

pub mod build;
pub mod check;
pub mod config;

pub use build::execute as build;
pub use check::execute as check;
pub use config::execute as config;
