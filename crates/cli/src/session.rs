//! Tracking session lifecycle
//!
//! Startup order: resolve the root, load ignore rules, open the snapshot
//! controller (creating a git repository if needed), spawn the batch
//! scheduler, then start the file watcher. Shutdown runs in reverse: the
//! watcher stops first so no event arrives after the scheduler has
//! cancelled its timers.

use crate::pipeline::AnalysisPipeline;
use crate::util::format_interval;
use analysis::{AnalysisClient, AnalysisReport};
use anyhow::{anyhow, Context, Result};
use bv_core::{IgnoreRules, TrackSettings};
use snapshot::SnapshotController;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use watcher::{BatchScheduler, FsWatcher, SchedulerConfig, SchedulerStats};

/// Watch events buffered between the notify thread and the scheduler
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How long shutdown waits for an in-flight flush
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// A running `brainvibe track` session
pub struct TrackSession {
    watcher: FsWatcher,
    shutdown: oneshot::Sender<()>,
    scheduler: JoinHandle<SchedulerStats>,
}

impl TrackSession {
    pub async fn start(settings: TrackSettings) -> Result<Self> {
        let root = canonical_root(&settings)?;
        let (rules, snapshots) = open_project(&root, &settings).await?;
        let client =
            AnalysisClient::from_settings(&settings).context("Failed to create analysis client")?;

        let pipeline = Arc::new(AnalysisPipeline::new(
            snapshots,
            client,
            Arc::clone(&rules),
        ));
        let scheduler = BatchScheduler::new(
            SchedulerConfig {
                debounce: settings.debounce,
                ceiling: settings.ceiling,
            },
            pipeline,
        );

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let scheduler = tokio::spawn(scheduler.run(rx, async move {
            let _ = shutdown_rx.await;
        }));

        let watcher = match FsWatcher::start(&root, Arc::clone(&rules), tx) {
            Ok(watcher) => watcher,
            Err(e) => {
                let _ = shutdown.send(());
                let _ = scheduler.await;
                return Err(e);
            }
        };

        info!("Tracking session started for {}", root.display());

        Ok(Self {
            watcher,
            shutdown,
            scheduler,
        })
    }

    /// Stop watching, cancel the timers and wait up to `grace` for an
    /// in-flight flush
    ///
    /// A flush still running after `grace` is abandoned and reported as an
    /// error.
    pub async fn shutdown(self, grace: Duration) -> Result<SchedulerStats> {
        let Self {
            watcher,
            shutdown,
            mut scheduler,
        } = self;

        watcher.stop();
        let _ = shutdown.send(());

        match tokio::time::timeout(grace, &mut scheduler).await {
            Ok(stats) => stats.context("Batch scheduler task failed"),
            Err(_) => {
                scheduler.abort();
                Err(anyhow!(
                    "In-flight batch did not finish within {}, abandoned",
                    format_interval(grace)
                ))
            }
        }
    }

    /// Track until Ctrl+C, then shut down
    ///
    /// A second Ctrl+C during shutdown stops waiting for the in-flight flush.
    pub async fn run_until_ctrl_c(self) -> Result<SchedulerStats> {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!(
            "Interrupt received, stopping tracking (Ctrl+C again to abandon the current batch)"
        );

        tokio::select! {
            stats = self.shutdown(SHUTDOWN_GRACE) => stats,
            _ = tokio::signal::ctrl_c() => {
                warn!("Second interrupt received, abandoning the current batch");
                Err(anyhow!("Tracking interrupted during shutdown"))
            }
        }
    }
}

/// Stage the whole working tree, take one checkpoint and analyze it
///
/// Returns `None` when nothing changed since `HEAD`.
pub async fn run_once(settings: &TrackSettings) -> Result<Option<AnalysisReport>> {
    let root = canonical_root(settings)?;
    let (rules, snapshots) = open_project(&root, settings).await?;
    let client =
        AnalysisClient::from_settings(settings).context("Failed to create analysis client")?;

    snapshots
        .stage_all()
        .await
        .context("Failed to stage working tree")?;
    let Some(diff) = snapshots
        .take_checkpoint_diff()
        .await
        .context("Failed to take checkpoint")?
    else {
        info!("No changes to analyze");
        return Ok(None);
    };

    Ok(Some(client.analyze(&diff.patch, &diff.paths, &rules).await))
}

fn canonical_root(settings: &TrackSettings) -> Result<PathBuf> {
    let root = settings.layout.root();
    root.canonicalize()
        .with_context(|| format!("Failed to resolve project root {}", root.display()))
}

async fn open_project(
    root: &Path,
    settings: &TrackSettings,
) -> Result<(Arc<IgnoreRules>, Arc<SnapshotController>)> {
    let rules = IgnoreRules::load(root, &settings.ignore);
    info!("Ignore rules loaded ({} active sources)", rules.active_sources());

    let snapshots = SnapshotController::open(root)
        .await
        .with_context(|| format!("Failed to open git working copy at {}", root.display()))?;

    Ok((Arc::new(rules), Arc::new(snapshots)))
}
