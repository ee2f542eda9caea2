//! Release pipeline stages
//!
//! - **version**: resolve the release version
//! - **writer**: write it into the PHP entry file and JSON manifests
//! - **build**: external asset build and dependency install
//! - **inclusion** / **assemble** / **package**: select files, populate the
//!   distribution checkout, package the zip
//! - **publish**: tags, pushes and hosted releases
//! - **pipeline**: runs the stages in order and records the run report

pub mod assemble;
pub mod build;
pub mod inclusion;
pub mod manifest;
pub mod package;
pub mod pipeline;
pub mod publish;
pub mod version;
pub mod writer;
