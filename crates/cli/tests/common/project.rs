//! Initialized BrainVibe project in a temporary directory

use anyhow::Result;
use bv_core::{ProjectLayout, TrackOverrides, TrackSettings};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create `.brainvibe/config.json` pointing at `api_url`
    pub fn init(api_url: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let layout = ProjectLayout::new(dir.path());
        fs::create_dir_all(layout.brainvibe_dir())?;

        let config = serde_json::json!({
            "name": "e2e",
            "absolutePath": dir.path(),
            "createdAt": "2024-03-01T10:00:00.000Z",
            "projectId": "42",
            "apiUrl": api_url,
        });
        fs::write(layout.config_file(), serde_json::to_string_pretty(&config)?)?;

        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn settings(&self, overrides: TrackOverrides) -> Result<TrackSettings> {
        Ok(TrackSettings::resolve(
            ProjectLayout::new(self.root()),
            overrides,
        )?)
    }
}
