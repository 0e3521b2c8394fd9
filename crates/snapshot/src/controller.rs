//! Snapshot controller over the project's git working copy
//!
//! A checkpoint is a real commit that lives only for the duration of one
//! diff: staged changes are committed, the commit's tree is diffed against
//! the previous checkpoint's tree, and HEAD is moved back to where it was.
//! The staged changes stay in the index, so the tree of the previous
//! checkpoint is remembered in memory as the baseline for the next diff.

use crate::git::Git;
use crate::Result;
use chrono::Utc;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Diff produced by one checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Whole-tree unified diff
    pub patch: String,
    /// Root-relative paths touched by the diff
    pub paths: Vec<PathBuf>,
}

/// Tree id of the last checkpoint
#[derive(Debug)]
struct Baseline {
    tree: String,
}

pub struct SnapshotController {
    root: PathBuf,
    git: Git,
    baseline: Mutex<Baseline>,
}

impl SnapshotController {
    /// Open the working copy at `root`, creating a repository if none exists
    pub async fn open(root: &Path) -> Result<Self> {
        let git = Git::new(root);

        if !root.join(".git").exists() {
            git.run(["init", "--quiet"]).await?;
            info!("Initialized git repository at {}", root.display());
        }

        let tree = match git.try_run(["rev-parse", "--verify", "-q", "HEAD^{tree}"]).await? {
            Some(tree) => tree,
            None => empty_tree(&git).await?,
        };
        debug!("Snapshot baseline tree {}", tree);

        Ok(Self {
            root: root.to_path_buf(),
            git,
            baseline: Mutex::new(Baseline { tree }),
        })
    }

    /// Tree id the next checkpoint will be diffed against
    pub async fn baseline_tree(&self) -> String {
        self.baseline.lock().await.tree.clone()
    }

    /// Stage `path` (root-relative) for the next checkpoint
    pub async fn stage_path(&self, path: &Path) -> Result<()> {
        let _guard = self.baseline.lock().await;
        self.add(path).await
    }

    /// Stage the removal of `path` (root-relative) for the next checkpoint
    pub async fn unstage_path(&self, path: &Path) -> Result<()> {
        let _guard = self.baseline.lock().await;
        self.remove(path).await
    }

    /// Stage every change in the working tree
    pub async fn stage_all(&self) -> Result<()> {
        let _guard = self.baseline.lock().await;
        self.git.run(["add", "-A"]).await?;
        Ok(())
    }

    /// Commit a temporary checkpoint, diff it against the previous one and
    /// roll the commit back. Returns `None` when nothing changed.
    pub async fn take_checkpoint_diff(&self) -> Result<Option<SnapshotDiff>> {
        let mut baseline = self.baseline.lock().await;
        self.checkpoint(&mut baseline).await
    }

    /// Stage `paths` according to their state on disk, then take a checkpoint
    ///
    /// Never fails: errors are logged and reported as "no diff".
    pub async fn snapshot(&self, paths: &[PathBuf]) -> Option<SnapshotDiff> {
        let mut baseline = self.baseline.lock().await;

        for path in paths {
            let result = if self.exists(path).await {
                self.add(path).await
            } else {
                self.remove(path).await
            };
            if let Err(e) = result {
                warn!("Failed to stage {}: {}", path.display(), e);
            }
        }

        match self.checkpoint(&mut baseline).await {
            Ok(diff) => diff,
            Err(e) => {
                warn!("Snapshot failed, batch produced no diff: {}", e);
                None
            }
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::symlink_metadata(self.root.join(path)).await.is_ok()
    }

    async fn add(&self, path: &Path) -> Result<()> {
        self.git
            .run([OsStr::new("add"), OsStr::new("--"), path.as_os_str()])
            .await?;
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        self.git
            .run([
                OsStr::new("rm"),
                OsStr::new("--cached"),
                OsStr::new("-r"),
                OsStr::new("-q"),
                OsStr::new("--ignore-unmatch"),
                OsStr::new("--"),
                path.as_os_str(),
            ])
            .await?;
        Ok(())
    }

    async fn checkpoint(&self, baseline: &mut Baseline) -> Result<Option<SnapshotDiff>> {
        let previous_head = self
            .git
            .try_run(["rev-parse", "--verify", "-q", "HEAD"])
            .await?;

        let message = format!(
            "brainvibe snapshot {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ")
        );
        // Hooks must not see checkpoints; --no-verify does not cover post-commit
        self.git
            .run([
                "-c",
                "core.hooksPath=/dev/null",
                "commit",
                "--no-verify",
                "--no-gpg-sign",
                "--allow-empty",
                "--quiet",
                "-m",
                message.as_str(),
            ])
            .await?;

        // Diff before rollback; rollback runs even if the diff failed
        let diff = self.diff_against(&baseline.tree).await;
        self.restore_head(previous_head.as_deref()).await?;
        let (tree, diff) = diff?;

        baseline.tree = tree;
        Ok(diff)
    }

    async fn diff_against(&self, base: &str) -> Result<(String, Option<SnapshotDiff>)> {
        let tree = self.git.run(["rev-parse", "HEAD^{tree}"]).await?;
        if tree == base {
            return Ok((tree, None));
        }

        let patch = self
            .git
            .run_lossy([
                "diff-tree",
                "-r",
                "-p",
                "--no-color",
                "--no-ext-diff",
                base,
                tree.as_str(),
            ])
            .await?;
        let names = self
            .git
            .run([
                "diff-tree",
                "-r",
                "-z",
                "--name-only",
                "--no-color",
                base,
                tree.as_str(),
            ])
            .await?;
        let paths: Vec<PathBuf> = names
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(PathBuf::from)
            .collect();

        if patch.trim().is_empty() && paths.is_empty() {
            return Ok((tree, None));
        }

        info!("Checkpoint diff: {} file(s), {} bytes", paths.len(), patch.len());
        Ok((tree, Some(SnapshotDiff { patch, paths })))
    }

    /// Roll HEAD back to `previous_head`, retrying once
    async fn restore_head(&self, previous_head: Option<&str>) -> Result<()> {
        let Err(first) = self.rollback(previous_head).await else {
            return Ok(());
        };
        warn!("Checkpoint rollback failed, retrying: {}", first);

        self.rollback(previous_head).await.map_err(|e| {
            error!(
                "Checkpoint commit left on HEAD (expected {}): {}",
                previous_head.unwrap_or("no commits"),
                e
            );
            e
        })
    }

    async fn rollback(&self, previous_head: Option<&str>) -> Result<()> {
        match previous_head {
            Some(head) => {
                self.git.run(["reset", "--soft", "--quiet", head]).await?;
            }
            None => {
                self.git.run(["update-ref", "-d", "HEAD"]).await?;
            }
        }
        Ok(())
    }
}

async fn empty_tree(git: &Git) -> Result<String> {
    git.run_with_stdin(["hash-object", "-t", "tree", "-w", "--stdin"], b"")
        .await
}
