//! Ignore pattern management for tracking sessions
//!
//! Two independent predicates are answered from the same rule set:
//! 1. Watch rules: filesystem noise dropped at event intake (dotfiles,
//!    dependency and build directories, editor temp files, and optionally
//!    the project's `.gitignore`)
//! 2. Analysis rules: everything the watch rules reject, plus files that are
//!    not worth analyzing (lockfiles, minified bundles, docs, logs, binaries)
//!    and the project's `.brainvibeignore` overrides
//!
//! A path rejected only by the analysis rules is still staged and tracked; it
//! just never produces an analysis request.

use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::project::ProjectLayout;

/// Built-in watch patterns (gitignore syntax, matched against the path and all parents)
pub const DEFAULT_WATCH_PATTERNS: &[&str] = &[
    // Dotfiles and dot-directories (.git, .brainvibe, .env, .DS_Store, .#lock files)
    ".*",
    // Dependencies
    "node_modules",
    "bower_components",
    "vendor",
    "venv",
    "env",
    "__pycache__",
    // Build output
    "dist",
    "build",
    "out",
    "target",
    // Editor temporaries
    "*.swp",
    "*.swo",
    "*~",
    "\\#*#",
    "*.pyc",
    // OS noise
    "Thumbs.db",
    "desktop.ini",
];

/// Built-in analysis-only patterns
pub const DEFAULT_ANALYSIS_PATTERNS: &[&str] = &[
    // Lockfiles
    "*.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    // Minified bundles and source maps
    "*.min.js",
    "*.min.css",
    "*.map",
    // Documentation
    "*.md",
    "*.rst",
    "*.txt",
    "LICENSE*",
    "README*",
    "docs",
    // Logs
    "*.log",
    "logs",
    // Binaries and media
    "*.jpg",
    "*.jpeg",
    "*.png",
    "*.gif",
    "*.ico",
    "*.pdf",
    "*.zip",
    "*.exe",
    "*.dll",
    "*.so",
    "*.bin",
];

/// Ignore configuration (the `[ignore]` section of `tracker.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreOptions {
    /// Override file, relative to the project root or absolute
    /// (default: `.brainvibeignore`)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Apply the project's `.gitignore` to the watch rules (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
}

impl Default for IgnoreOptions {
    fn default() -> Self {
        Self {
            file: None,
            use_gitignore: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Ignore rule set for one tracking session
///
/// Loaded once at session start and immutable afterwards.
pub struct IgnoreRules {
    /// Project root directory
    root: PathBuf,

    /// Built-in watch patterns
    watch: Gitignore,

    /// Project .gitignore (optional)
    gitignore: Option<Gitignore>,

    /// Built-in analysis patterns followed by override patterns
    analysis: Gitignore,

    /// Override file that was loaded, if any
    override_file: Option<PathBuf>,

    /// Number of patterns read from the override file
    override_count: usize,
}

impl IgnoreRules {
    /// Built-in rules only
    pub fn defaults(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            watch: build_matcher(root, DEFAULT_WATCH_PATTERNS.iter().copied(), "defaults"),
            gitignore: None,
            analysis: build_matcher(root, DEFAULT_ANALYSIS_PATTERNS.iter().copied(), "defaults"),
            override_file: None,
            override_count: 0,
        }
    }

    /// Load built-in rules plus project overrides
    ///
    /// Never fails: an unreadable override file is logged and the built-in
    /// rules are used on their own.
    pub fn load(root: &Path, options: &IgnoreOptions) -> Self {
        let mut rules = Self::defaults(root);

        if options.use_gitignore {
            let gitignore_path = root.join(".gitignore");
            if gitignore_path.is_file() {
                let mut builder = GitignoreBuilder::new(root);
                if let Some(e) = builder.add(&gitignore_path) {
                    warn!("Skipping invalid .gitignore entries: {}", e);
                }
                match builder.build() {
                    Ok(gitignore) => rules.gitignore = Some(gitignore),
                    Err(e) => warn!("Failed to load .gitignore: {}", e),
                }
            }
        }

        let layout = ProjectLayout::new(root);
        let (override_path, explicit) = match &options.file {
            Some(file) => (layout.resolve(file), true),
            None => (layout.default_ignore_file(), false),
        };

        if !explicit && !override_path.exists() {
            return rules;
        }

        match std::fs::read_to_string(&override_path) {
            Ok(contents) => {
                let patterns = parse_override_lines(&contents);
                rules.override_count = patterns.len();
                rules.analysis = build_matcher(
                    root,
                    DEFAULT_ANALYSIS_PATTERNS
                        .iter()
                        .copied()
                        .chain(patterns.iter().map(String::as_str)),
                    &override_path.display().to_string(),
                );
                info!(
                    "Loaded {} ignore patterns from {}",
                    rules.override_count,
                    override_path.display()
                );
                rules.override_file = Some(override_path);
            }
            Err(e) => {
                warn!(
                    "Failed to read ignore file {}: {} (using default rules)",
                    override_path.display(),
                    e
                );
            }
        }

        rules
    }

    /// Should a filesystem event for `path` be dropped?
    ///
    /// Accepts absolute paths under the root or root-relative paths. Paths
    /// outside the root are always ignored.
    pub fn is_ignored_for_watch(&self, path: &Path) -> bool {
        let Some(rel) = self.relative_path(path) else {
            return true;
        };
        self.watch_matches(&rel)
    }

    /// Should `path` be left out of analysis requests?
    pub fn is_ignored_for_analysis(&self, path: &Path) -> bool {
        let Some(rel) = self.relative_path(path) else {
            return true;
        };
        if self.watch_matches(&rel) {
            return true;
        }
        let is_dir = self.root.join(&rel).is_dir();
        self.analysis
            .matched_path_or_any_parents(&rel, is_dir)
            .is_ignore()
    }

    fn watch_matches(&self, rel: &Path) -> bool {
        let is_dir = self.root.join(rel).is_dir();

        if self.watch.matched_path_or_any_parents(rel, is_dir).is_ignore() {
            return true;
        }

        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched_path_or_any_parents(rel, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Convert `path` to a normalized root-relative path
    ///
    /// Returns `None` for paths outside the root, the root itself, or paths
    /// that climb out with `..`.
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        let mut normalized = PathBuf::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }

        if normalized.as_os_str().is_empty() {
            None
        } else {
            Some(normalized)
        }
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        let mut count = 1; // Built-in always active
        if self.gitignore.is_some() {
            count += 1;
        }
        if self.override_file.is_some() {
            count += 1;
        }
        count
    }

    /// Override file that was loaded, if any
    pub fn override_file(&self) -> Option<&Path> {
        self.override_file.as_deref()
    }

    /// Number of override patterns
    pub fn override_count(&self) -> usize {
        self.override_count
    }

    /// Get project root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Parse override file contents into gitignore lines
///
/// Blank lines and `#` comments are skipped. Patterns with an inner `/` are
/// made to match at any depth.
fn parse_override_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize_override)
        .collect()
}

fn normalize_override(line: &str) -> String {
    let (negated, body) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let anchored = body.starts_with('/') || body.starts_with("**/");
    let has_inner_slash = body.trim_end_matches('/').contains('/');

    let pattern = if has_inner_slash && !anchored {
        format!("**/{}", body)
    } else {
        body.to_string()
    };

    if negated {
        format!("!{}", pattern)
    } else {
        pattern
    }
}

fn build_matcher<'a>(
    root: &Path,
    lines: impl IntoIterator<Item = &'a str>,
    source: &str,
) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);

    for line in lines {
        if let Err(e) = builder.add_line(None, line) {
            warn!("Skipping invalid ignore pattern '{}' from {}: {}", line, source, e);
        }
    }

    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build ignore rules from {}: {}", source, e);
        debug!("Falling back to an empty matcher for {}", source);
        Gitignore::empty()
    })
}
