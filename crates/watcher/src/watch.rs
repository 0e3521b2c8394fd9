//! notify-backed recursive watcher
//!
//! Raw notify events are translated into root-relative [`WatchEvent`]s,
//! filtered through the watch rules and pushed onto a bounded channel
//! read by the batch scheduler.

use crate::{EventKind, WatchEvent};
use anyhow::{Context, Result};
use bv_core::IgnoreRules;
use notify::event::ModifyKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Recursive watcher over the project root
///
/// Dropping (or calling [`FsWatcher::stop`]) stops event delivery.
pub struct FsWatcher {
    root: PathBuf,
    _inner: RecommendedWatcher,
}

impl FsWatcher {
    /// Start watching `root` recursively
    ///
    /// `root` should be canonical and match the root `rules` were built for.
    pub fn start(
        root: &Path,
        rules: Arc<IgnoreRules>,
        tx: mpsc::Sender<WatchEvent>,
    ) -> Result<Self> {
        let mut inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for watch_event in translate(&event, &rules) {
                        // Receiver gone means the scheduler has shut down
                        if tx.blocking_send(watch_event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        inner
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        info!("Watching {} for changes", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            _inner: inner,
        })
    }

    pub fn stop(self) {
        debug!("Stopping watcher on {}", self.root.display());
    }
}

/// Map a raw notify event onto zero or more accepted watch events
pub fn translate(event: &notify::Event, rules: &IgnoreRules) -> Vec<WatchEvent> {
    let Some(kind) = classify(&event.kind) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(event.paths.len());
    for path in &event.paths {
        let Some(rel) = rules.relative_path(path) else {
            continue;
        };
        if rules.is_ignored_for_watch(&rel) {
            continue;
        }
        // A directory moved in or created reports no events for its files;
        // its path stands for everything under it. Plain metadata changes on
        // a directory carry nothing.
        if kind == EventKind::Modify && rules.root().join(&rel).is_dir() {
            continue;
        }
        out.push(WatchEvent::new(rel, kind));
    }
    out
}

fn classify(kind: &notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Access(_) => None,
        notify::EventKind::Create(_) => Some(EventKind::Create),
        notify::EventKind::Remove(_) => Some(EventKind::Delete),
        notify::EventKind::Modify(ModifyKind::Name(_)) => Some(EventKind::Rename),
        notify::EventKind::Modify(_) => Some(EventKind::Modify),
        notify::EventKind::Any | notify::EventKind::Other => Some(EventKind::Modify),
    }
}
