//! Core building blocks for plugin-release
//!
//! - **config**: project configuration (release.toml) parsing and validation
//! - **context**: command-line options plus everything loaded before the first stage
//! - **error**: error types with contextual help messages
//! - **exec**: external command runner and failure classification
//! - **vcs**: git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod vcs;
