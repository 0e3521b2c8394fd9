//! Project layout and root discovery
//!
//! A tracked project is any directory containing `.brainvibe/`:
//! ```text
//! <root>/
//!   .brainvibe/
//!     config.json     (written by `brainvibe init`)
//!     tracker.toml    (optional tracker overrides)
//!   .brainvibeignore  (optional analysis ignore overrides)
//! ```

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the metadata directory at the project root
pub const BRAINVIBE_DIR: &str = ".brainvibe";
/// Project config written by the initialization command
pub const CONFIG_FILE: &str = "config.json";
/// Optional tracker settings
pub const TRACKER_FILE: &str = "tracker.toml";
/// Default analysis ignore override file at the project root
pub const IGNORE_FILE: &str = ".brainvibeignore";

/// Resolved paths for a tracked project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the project root by walking up from `start` to the nearest `.brainvibe/`
    ///
    /// Falls back to `start` itself when no ancestor is initialized, so the
    /// precondition check in [`ProjectLayout::require_initialized`] reports the
    /// directory the user actually asked for.
    pub fn discover(start: &Path) -> Self {
        let mut current = Some(start);

        while let Some(dir) = current {
            if dir.join(BRAINVIBE_DIR).is_dir() {
                return Self::new(dir);
            }
            current = dir.parent();
        }

        Self::new(start)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn brainvibe_dir(&self) -> PathBuf {
        self.root.join(BRAINVIBE_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.brainvibe_dir().join(CONFIG_FILE)
    }

    pub fn tracker_file(&self) -> PathBuf {
        self.brainvibe_dir().join(TRACKER_FILE)
    }

    pub fn default_ignore_file(&self) -> PathBuf {
        self.root.join(IGNORE_FILE)
    }

    /// Fail unless the project has been initialized
    pub fn require_initialized(&self) -> Result<()> {
        if self.config_file().is_file() {
            Ok(())
        } else {
            Err(Error::NotInitialized(self.root.clone()))
        }
    }

    /// Resolve a possibly-relative path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
