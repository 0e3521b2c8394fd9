//! Batch scheduler: debounce + ceiling flush triggers
//!
//! Accepted watch events accumulate into a pending set. Two timers decide
//! when that set is flushed:
//!
//! - the debounce timer is re-armed by every event and fires after a quiet
//!   period
//! - the ceiling timer is armed by the first event of a window and is never
//!   pushed back, so a continuously edited file is still flushed at least
//!   once per ceiling interval
//!
//! At most one flush runs at a time. A trigger that fires while a flush is
//! in flight is recorded and coalesced into a single follow-up flush once
//! the current one completes.
//!
//! The scheduler owns the accumulator and both timers and is driven from a
//! single `select!` loop, so event handling, timer expiry and flush
//! completion are serialized.

use crate::accumulator::ChangeAccumulator;
use crate::timer::Timer;
use crate::WatchEvent;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

/// Timer durations for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quiet period after the last event before flushing
    pub debounce: Duration,
    /// Maximum time between the first pending event and a flush
    pub ceiling: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(bv_core::config::DEFAULT_DEBOUNCE_MS),
            ceiling: Duration::from_millis(bv_core::config::DEFAULT_CEILING_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing pending, no flush running
    Idle,
    /// Changes pending, waiting for a timer
    Accumulating,
    /// A flush is running
    Flushing,
}

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Debounce,
    Ceiling,
    /// Deferred trigger that fired while the previous flush was running
    FollowUp,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushTrigger::Debounce => "debounce",
            FlushTrigger::Ceiling => "ceiling",
            FlushTrigger::FollowUp => "follow-up",
        };
        f.write_str(name)
    }
}

/// Paths drained from the accumulator for one flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Monotonic flush number, starting at 1
    pub seq: u64,
    pub trigger: FlushTrigger,
    /// Root-relative paths, sorted and unique
    pub paths: Vec<PathBuf>,
}

/// Summary of one completed flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Whether the snapshot produced a non-empty diff
    pub diff_produced: bool,
    pub files_sent: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
}

impl FlushOutcome {
    /// Outcome of a flush whose snapshot had nothing to report
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Work performed for each flushed batch
///
/// Implementations must not fail: errors are logged and reflected in the
/// returned outcome so the scheduler keeps running.
#[async_trait]
pub trait FlushHandler: Send + Sync + 'static {
    async fn flush(&self, batch: Batch) -> FlushOutcome;
}

/// Counters reported when the scheduler stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub events: u64,
    pub flushes: u64,
    /// Triggers that fired while a flush was in flight
    pub coalesced: u64,
    /// Pending paths discarded at shutdown
    pub dropped_on_shutdown: usize,
}

enum Wake {
    Shutdown,
    Event(WatchEvent),
    FlushDone(Result<FlushOutcome, JoinError>),
    Ceiling,
    Debounce,
}

pub struct BatchScheduler<H> {
    config: SchedulerConfig,
    handler: Arc<H>,
    accumulator: ChangeAccumulator,
    debounce: Timer,
    ceiling: Timer,
    in_flight: Option<JoinHandle<FlushOutcome>>,
    follow_up: bool,
    next_seq: u64,
    stats: SchedulerStats,
}

impl<H: FlushHandler> BatchScheduler<H> {
    pub fn new(config: SchedulerConfig, handler: Arc<H>) -> Self {
        Self {
            config,
            handler,
            accumulator: ChangeAccumulator::new(),
            debounce: Timer::new(),
            ceiling: Timer::new(),
            in_flight: None,
            follow_up: false,
            next_seq: 0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.in_flight.is_some() {
            SchedulerState::Flushing
        } else if !self.accumulator.is_empty() {
            SchedulerState::Accumulating
        } else {
            SchedulerState::Idle
        }
    }

    /// Drive the scheduler until `shutdown` resolves or the event channel
    /// closes
    ///
    /// On shutdown both timers are cancelled, an in-flight flush is awaited
    /// and any changes still pending are dropped.
    pub async fn run<S>(
        mut self,
        mut events: mpsc::Receiver<WatchEvent>,
        shutdown: S,
    ) -> SchedulerStats
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        info!(
            "Batch scheduler started (debounce {:?}, ceiling {:?})",
            self.config.debounce, self.config.ceiling
        );

        loop {
            let wake = tokio::select! {
                biased;
                _ = &mut shutdown => Wake::Shutdown,
                event = events.recv() => match event {
                    Some(event) => Wake::Event(event),
                    None => Wake::Shutdown,
                },
                result = join_in_flight(&mut self.in_flight) => Wake::FlushDone(result),
                _ = self.ceiling.expired() => Wake::Ceiling,
                _ = self.debounce.expired() => Wake::Debounce,
            };

            match wake {
                Wake::Shutdown => break,
                Wake::Event(event) => self.on_event(event),
                Wake::FlushDone(result) => {
                    self.in_flight = None;
                    self.on_flush_complete(result);
                }
                Wake::Ceiling => {
                    self.ceiling.cancel();
                    self.trigger(FlushTrigger::Ceiling);
                }
                Wake::Debounce => {
                    self.debounce.cancel();
                    self.trigger(FlushTrigger::Debounce);
                }
            }
        }

        self.shutdown().await
    }

    fn on_event(&mut self, event: WatchEvent) {
        self.stats.events += 1;
        info!("File {} has been {}", event.path.display(), event.kind);

        self.accumulator.add(event.path);
        self.debounce.arm(self.config.debounce);
        if !self.ceiling.is_armed() {
            self.ceiling.arm(self.config.ceiling);
        }
    }

    fn trigger(&mut self, trigger: FlushTrigger) {
        if self.in_flight.is_some() {
            self.stats.coalesced += 1;
            if !self.accumulator.is_empty() {
                self.follow_up = true;
            }
            debug!("{} trigger deferred: flush already in flight", trigger);
            return;
        }

        if self.accumulator.is_empty() {
            debug!("{} timer fired with nothing pending", trigger);
            return;
        }

        self.start_flush(trigger);
    }

    fn start_flush(&mut self, trigger: FlushTrigger) {
        let paths: Vec<PathBuf> = self.accumulator.drain_all().into_iter().collect();
        self.next_seq += 1;
        self.stats.flushes += 1;

        info!(
            "Flushing batch #{} ({} file(s), trigger: {})",
            self.next_seq,
            paths.len(),
            trigger
        );

        let batch = Batch {
            seq: self.next_seq,
            trigger,
            paths,
        };
        let handler = Arc::clone(&self.handler);
        self.in_flight = Some(tokio::spawn(async move { handler.flush(batch).await }));
    }

    fn on_flush_complete(&mut self, result: Result<FlushOutcome, JoinError>) {
        log_outcome(&result);

        if self.accumulator.is_empty() {
            self.follow_up = false;
            return;
        }

        // Changes that arrived during the flush start a new ceiling window
        if !self.ceiling.is_armed() {
            self.ceiling.arm(self.config.ceiling);
        }

        if std::mem::take(&mut self.follow_up) {
            self.start_flush(FlushTrigger::FollowUp);
        }
    }

    async fn shutdown(mut self) -> SchedulerStats {
        self.debounce.cancel();
        self.ceiling.cancel();
        self.follow_up = false;

        if let Some(handle) = self.in_flight.take() {
            info!("Waiting for in-flight flush to finish");
            log_outcome(&handle.await);
        }

        let dropped = self.accumulator.len();
        if dropped > 0 {
            info!("Dropping {} pending change(s) on shutdown", dropped);
        }
        self.stats.dropped_on_shutdown = dropped;

        info!(
            "Batch scheduler stopped: {} event(s), {} flush(es)",
            self.stats.events, self.stats.flushes
        );
        self.stats
    }
}

async fn join_in_flight(
    slot: &mut Option<JoinHandle<FlushOutcome>>,
) -> Result<FlushOutcome, JoinError> {
    match slot.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn log_outcome(result: &Result<FlushOutcome, JoinError>) {
    match result {
        Ok(outcome) if outcome.diff_produced => info!(
            "Flush complete: {} sent, {} failed, {} skipped",
            outcome.files_sent, outcome.files_failed, outcome.files_skipped
        ),
        Ok(_) => info!("Flush complete: no changes to analyze"),
        Err(e) => error!("Flush task failed: {}", e),
    }
}
