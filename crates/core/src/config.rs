//! Project and tracker configuration
//!
//! Two files feed a tracking session:
//! - `.brainvibe/config.json`: project identity, owned by `brainvibe init`
//! - `.brainvibe/tracker.toml`: optional timer/ignore/HTTP overrides
//!
//! Command-line options win over `tracker.toml`, which wins over defaults.

use crate::ignore::IgnoreOptions;
use crate::project::ProjectLayout;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_DEBOUNCE_MS: u64 = 3_000;
pub const DEFAULT_CEILING_MS: u64 = 120_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHANGE_SOURCE: &str = "cli";

/// Project record written at initialization time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,

    /// Absolute path recorded at init
    #[serde(default, alias = "absolutePath")]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(alias = "project_id")]
    pub project_id: String,

    #[serde(default = "default_api_url", alias = "api_url")]
    pub api_url: String,
}

impl ProjectConfig {
    /// Load `.brainvibe/config.json`
    ///
    /// A missing file is a precondition failure, not an I/O error.
    pub fn load(layout: &ProjectLayout) -> Result<Self> {
        layout.require_initialized()?;

        let path = layout.config_file();
        let raw = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let config: Self =
            serde_json::from_str(&raw).map_err(|source| Error::ProjectConfig { path, source })?;

        if config.project_id.trim().is_empty() {
            return Err(Error::InvalidSetting("projectId must not be empty".into()));
        }

        Ok(config)
    }

    /// Human-readable project name, falling back to the project id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.project_id
        } else {
            &self.name
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Contents of `.brainvibe/tracker.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub tracker: TrackerSection,

    #[serde(default)]
    pub ignore: IgnoreOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSection {
    /// Quiet period before a batch is flushed (default: 3000)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Upper bound between flushes under continuous churn (default: 120000)
    #[serde(default = "default_ceiling_ms")]
    pub ceiling_ms: u64,

    /// Per-request HTTP timeout (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Value sent as `change_source` (default: "cli")
    #[serde(default = "default_change_source")]
    pub change_source: String,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ceiling_ms: DEFAULT_CEILING_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            change_source: DEFAULT_CHANGE_SOURCE.to_string(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_ceiling_ms() -> u64 {
    DEFAULT_CEILING_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_change_source() -> String {
    DEFAULT_CHANGE_SOURCE.to_string()
}

impl TrackerConfig {
    /// Load `.brainvibe/tracker.toml`, or defaults when the file is absent
    pub fn load(layout: &ProjectLayout) -> Result<Self> {
        let path = layout.tracker_file();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let config: Self =
            toml::from_str(&raw).map_err(|source| Error::TrackerConfig { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;

        if !(100..=60_000).contains(&t.debounce_ms) {
            return Err(Error::InvalidSetting(format!(
                "tracker.debounce_ms must be 100-60000 (got {})",
                t.debounce_ms
            )));
        }
        if !(1_000..=86_400_000).contains(&t.ceiling_ms) {
            return Err(Error::InvalidSetting(format!(
                "tracker.ceiling_ms must be 1000-86400000 (got {})",
                t.ceiling_ms
            )));
        }
        if t.ceiling_ms < t.debounce_ms {
            return Err(Error::InvalidSetting(format!(
                "tracker.ceiling_ms ({}) must not be shorter than tracker.debounce_ms ({})",
                t.ceiling_ms, t.debounce_ms
            )));
        }
        if !(1..=600).contains(&t.request_timeout_secs) {
            return Err(Error::InvalidSetting(format!(
                "tracker.request_timeout_secs must be 1-600 (got {})",
                t.request_timeout_secs
            )));
        }
        if t.change_source.trim().is_empty() {
            return Err(Error::InvalidSetting(
                "tracker.change_source must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Command-line overrides applied on top of the config files
#[derive(Debug, Clone, Default)]
pub struct TrackOverrides {
    /// `--interval`: ceiling interval in milliseconds
    pub ceiling_ms: Option<u64>,
    /// `--ignore-file`
    pub ignore_file: Option<PathBuf>,
    /// `--api-url`
    pub api_url: Option<String>,
}

/// Fully resolved settings for one tracking session
#[derive(Debug, Clone)]
pub struct TrackSettings {
    pub layout: ProjectLayout,
    pub project: ProjectConfig,
    pub debounce: Duration,
    pub ceiling: Duration,
    pub request_timeout: Duration,
    pub change_source: String,
    pub ignore: IgnoreOptions,
}

impl TrackSettings {
    /// Load both config files for `layout` and apply `overrides`
    ///
    /// Fails fast when the project is not initialized.
    pub fn resolve(layout: ProjectLayout, overrides: TrackOverrides) -> Result<Self> {
        let mut project = ProjectConfig::load(&layout)?;
        let mut tracker = TrackerConfig::load(&layout)?;

        if let Some(ceiling_ms) = overrides.ceiling_ms {
            tracker.tracker.ceiling_ms = ceiling_ms;
        }
        if let Some(file) = overrides.ignore_file {
            tracker.ignore.file = Some(file);
        }
        if let Some(api_url) = overrides.api_url {
            project.api_url = api_url;
        }
        tracker.validate()?;

        Ok(Self {
            layout,
            project,
            debounce: Duration::from_millis(tracker.tracker.debounce_ms),
            ceiling: Duration::from_millis(tracker.tracker.ceiling_ms),
            request_timeout: Duration::from_secs(tracker.tracker.request_timeout_secs),
            change_source: tracker.tracker.change_source,
            ignore: tracker.ignore,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_project(dir: &TempDir, config_json: &str) -> ProjectLayout {
        let layout = ProjectLayout::new(dir.path());
        fs::create_dir_all(layout.brainvibe_dir()).unwrap();
        fs::write(layout.config_file(), config_json).unwrap();
        layout
    }

    #[test]
    fn test_project_config_camel_case() {
        let temp_dir = TempDir::new().unwrap();
        let layout = init_project(
            &temp_dir,
            r#"{
                "name": "demo",
                "absolutePath": "/work/demo",
                "createdAt": "2024-03-01T10:00:00.000Z",
                "projectId": "42",
                "apiUrl": "http://api.test/api"
            }"#,
        );

        let config = ProjectConfig::load(&layout).unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.path, Some(PathBuf::from("/work/demo")));
        assert!(config.created_at.is_some());
        assert_eq!(config.project_id, "42");
        assert_eq!(config.api_url, "http://api.test/api");
    }

    #[test]
    fn test_project_config_snake_case_and_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let layout = init_project(&temp_dir, r#"{"project_id": "7"}"#);

        let config = ProjectConfig::load(&layout).unwrap();
        assert_eq!(config.project_id, "7");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.display_name(), "7");
    }

    #[test]
    fn test_project_config_missing_is_not_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());

        let err = ProjectConfig::load(&layout).unwrap_err();
        assert!(matches!(err, Error::NotInitialized(_)));
    }

    #[test]
    fn test_project_config_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let layout = init_project(&temp_dir, "{ not json");

        let err = ProjectConfig::load(&layout).unwrap_err();
        assert!(matches!(err, Error::ProjectConfig { .. }));
    }

    #[test]
    fn test_tracker_config_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());

        let config = TrackerConfig::load(&layout).unwrap();
        assert_eq!(config.tracker.debounce_ms, 3_000);
        assert_eq!(config.tracker.ceiling_ms, 120_000);
        assert_eq!(config.tracker.change_source, "cli");
        assert!(config.ignore.use_gitignore);
        assert!(config.ignore.file.is_none());
    }

    #[test]
    fn test_tracker_config_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let layout = init_project(&temp_dir, r#"{"projectId": "1"}"#);
        fs::write(
            layout.tracker_file(),
            "[tracker]\nceiling_ms = 5000\n\n[ignore]\nfile = \"custom.ignore\"\n",
        )
        .unwrap();

        let config = TrackerConfig::load(&layout).unwrap();
        assert_eq!(config.tracker.ceiling_ms, 5_000);
        assert_eq!(config.tracker.debounce_ms, 3_000);
        assert_eq!(config.ignore.file, Some(PathBuf::from("custom.ignore")));
    }

    #[test]
    fn test_tracker_config_validation() {
        let mut config = TrackerConfig::default();
        assert!(config.validate().is_ok());

        config.tracker.debounce_ms = 50;
        assert!(config.validate().is_err());

        config.tracker.debounce_ms = 3_000;
        config.tracker.ceiling_ms = 2_000;
        assert!(config.validate().is_err());

        config.tracker.ceiling_ms = 5_000;
        config.tracker.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let layout = init_project(&temp_dir, r#"{"projectId": "9"}"#);

        let settings = TrackSettings::resolve(
            layout,
            TrackOverrides {
                ceiling_ms: Some(5_000),
                ignore_file: Some(PathBuf::from("other.ignore")),
                api_url: Some("http://127.0.0.1:9/api".into()),
            },
        )
        .unwrap();

        assert_eq!(settings.ceiling, Duration::from_millis(5_000));
        assert_eq!(settings.debounce, Duration::from_millis(3_000));
        assert_eq!(settings.project.api_url, "http://127.0.0.1:9/api");
        assert_eq!(settings.ignore.file, Some(PathBuf::from("other.ignore")));
    }

    #[test]
    fn test_resolve_rejects_ceiling_override_below_debounce() {
        let temp_dir = TempDir::new().unwrap();
        let layout = init_project(&temp_dir, r#"{"projectId": "9"}"#);

        let result = TrackSettings::resolve(
            layout,
            TrackOverrides {
                ceiling_ms: Some(1_000),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidSetting(_))));
    }
}
