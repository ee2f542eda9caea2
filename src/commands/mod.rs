//! CLI commands for plugin-release
//!
//! - **release**: resolve, write, build, assemble, package and publish a plugin release

pub mod release;

pub use release::run_release;
