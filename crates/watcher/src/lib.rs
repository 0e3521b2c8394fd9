//! File system watching and change batching for BrainVibe
//!
//! This crate provides:
//! - A notify-backed watcher that filters raw events through the watch rules
//! - The pending change set accumulated between flushes
//! - The batch scheduler (debounce + ceiling timers, one flush in flight)

pub mod accumulator;
pub mod scheduler;
pub mod timer;
pub mod watch;

pub use accumulator::ChangeAccumulator;
pub use scheduler::{
    Batch, BatchScheduler, FlushHandler, FlushOutcome, FlushTrigger, SchedulerConfig,
    SchedulerState, SchedulerStats,
};
pub use timer::Timer;
pub use watch::FsWatcher;

use std::fmt;
use std::path::PathBuf;

/// File system event accepted by the watch rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed, relative to the project root
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File modified
    Modify,
    /// File deleted
    Delete,
    /// File renamed (either side of the rename)
    Rename,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            EventKind::Create => "added",
            EventKind::Modify => "changed",
            EventKind::Delete => "removed",
            EventKind::Rename => "renamed",
        };
        f.write_str(verb)
    }
}
