//! Cancelable one-shot timer owned by the scheduler loop

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// A one-shot deadline that can be armed, re-armed and cancelled
///
/// `expired()` resolves at the deadline, or never while disarmed. The
/// returned future holds a copy of the deadline, so re-arming takes effect
/// the next time the owner polls a fresh `expired()` future.
#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer to fire `after` from now
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn expired(&self) -> impl Future<Output = ()> {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        }
    }
}
