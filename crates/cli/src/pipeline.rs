//! Flush pipeline: snapshot the batch, then analyze the diff

use crate::util;
use analysis::AnalysisClient;
use async_trait::async_trait;
use bv_core::IgnoreRules;
use snapshot::SnapshotController;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use watcher::{Batch, FlushHandler, FlushOutcome};

/// Flush handler used by a tracking session
pub struct AnalysisPipeline {
    snapshots: Arc<SnapshotController>,
    client: AnalysisClient,
    rules: Arc<IgnoreRules>,
}

impl AnalysisPipeline {
    pub fn new(
        snapshots: Arc<SnapshotController>,
        client: AnalysisClient,
        rules: Arc<IgnoreRules>,
    ) -> Self {
        Self {
            snapshots,
            client,
            rules,
        }
    }
}

#[async_trait]
impl FlushHandler for AnalysisPipeline {
    async fn flush(&self, batch: Batch) -> FlushOutcome {
        let Some(diff) = self.snapshots.snapshot(&batch.paths).await else {
            info!("Batch #{}: no changes since the last snapshot", batch.seq);
            return FlushOutcome::empty();
        };

        info!(
            "Batch #{}: {} diff across {} file(s)",
            batch.seq,
            util::format_size(diff.patch.len() as u64),
            diff.paths.len()
        );

        let files = changed_files(&batch.paths, &diff.paths);
        if files.len() != batch.paths.len() {
            debug!(
                "Batch #{}: {} pending path(s) resolved to {} changed file(s)",
                batch.seq,
                batch.paths.len(),
                files.len()
            );
        }

        let report = self.client.analyze(&diff.patch, &files, &self.rules).await;

        FlushOutcome {
            diff_produced: true,
            files_sent: report.sent,
            files_failed: report.failed,
            files_skipped: report.skipped,
        }
    }
}

/// Files in `diff_paths` at or under one of the batch paths
///
/// A batch path may name a directory that was moved or removed as a whole,
/// and a path whose content ended up unchanged has no entry in the diff.
fn changed_files(batch_paths: &[PathBuf], diff_paths: &[PathBuf]) -> Vec<PathBuf> {
    diff_paths
        .iter()
        .filter(|file| batch_paths.iter().any(|pending| file.starts_with(pending)))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_changed_files_expands_directories() {
        let files = changed_files(
            &paths(&["pkg", "main.py"]),
            &paths(&["main.py", "pkg/mod.py", "pkg/sub/util.py", "pkg2/other.py"]),
        );
        assert_eq!(files, paths(&["main.py", "pkg/mod.py", "pkg/sub/util.py"]));
    }

    #[test]
    fn test_changed_files_drops_paths_without_changes() {
        let files = changed_files(&paths(&["same.py", "edited.py"]), &paths(&["edited.py"]));
        assert_eq!(files, paths(&["edited.py"]));

        assert!(changed_files(&paths(&["empty_dir"]), &paths(&["edited.py"])).is_empty());
    }
}
