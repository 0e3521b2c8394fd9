//! Error type shared by configuration and project discovery

use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No `.brainvibe/config.json` at the tracked root
    #[error("project at {0} is not initialized (run `brainvibe init` first)")]
    NotInitialized(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project config {path}: {source}")]
    ProjectConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid tracker config {path}: {source}")]
    TrackerConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}
