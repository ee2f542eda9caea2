pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;
pub use system_git_ops::{CommitOutcome, TagOutcome};
