//! Throwaway git checkpoints for BrainVibe
//!
//! This crate provides:
//! - An async `git` command runner
//! - The snapshot controller: stage changed paths, commit a temporary
//!   checkpoint, diff it against the previous one, roll the commit back

pub mod controller;
pub mod git;

pub use controller::{SnapshotController, SnapshotDiff};
pub use git::Git;

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to run `git {command}` in {dir}: {source}")]
    Spawn {
        command: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with {status}: {stderr}")]
    Git {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`git {command}` produced non-UTF-8 output")]
    Utf8 {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}
