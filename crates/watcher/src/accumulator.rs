//! Pending change set between flushes

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

/// Relative paths touched since the last flush
///
/// Owned by the batch scheduler, so `add` and `drain_all` can never
/// interleave: a path added after a drain always lands in the next drain.
#[derive(Debug, Default)]
pub struct ChangeAccumulator {
    pending: HashSet<PathBuf>,
}

impl ChangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed path. Returns false if it was already pending.
    pub fn add(&mut self, path: PathBuf) -> bool {
        self.pending.insert(path)
    }

    /// Take every pending path, leaving the set empty
    pub fn drain_all(&mut self) -> BTreeSet<PathBuf> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
