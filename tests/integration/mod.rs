//! Integration tests for plugin-release
//!
//! Each test drives the built binary against a temporary plugin checkout with
//! local bare repositories as remotes and shell stubs for npm, composer, zip
//! and gh.

#![cfg(unix)]

mod helpers;
mod test_cli;
mod test_release;
