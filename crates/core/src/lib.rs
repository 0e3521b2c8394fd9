//! Shared building blocks for BrainVibe tracking
//!
//! This crate provides:
//! - Project layout and root discovery (`.brainvibe/`)
//! - Project and tracker configuration
//! - Ignore rules for the watcher and the analysis filter

pub mod config;
pub mod error;
pub mod ignore;
pub mod project;

// Re-exports
pub use config::{ProjectConfig, TrackOverrides, TrackSettings, TrackerConfig};
pub use error::{Error, Result};
pub use self::ignore::{IgnoreOptions, IgnoreRules};
pub use project::ProjectLayout;
