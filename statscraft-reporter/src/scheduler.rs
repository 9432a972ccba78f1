//! Task scheduling seam.
//!
//! Every report runs off the host's foreground thread. The host supplies
//! the scheduler; `TokioScheduler` is the implementation for hosts running
//! on a tokio runtime.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A one-shot task.
pub type TaskFuture = BoxFuture<'static, ()>;

/// A task run on every tick of a periodic schedule.
pub type RepeatingTask = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Fire-and-forget task execution supplied by the host.
pub trait Scheduler: Send + Sync {
    /// Run `task` in the background as soon as possible.
    fn run_async(&self, task: TaskFuture);

    /// Run `task` once after `delay`.
    fn run_delayed(&self, task: TaskFuture, delay: Duration);

    /// Run `task` after `initial_delay`, then every `interval`, until the
    /// returned handle is cancelled.
    fn run_periodic_async(
        &self,
        task: RepeatingTask,
        initial_delay: Duration,
        interval: Duration,
    ) -> PeriodicHandle;
}

/// Stops one periodic schedule.
#[derive(Debug, Clone, Default)]
pub struct PeriodicHandle {
    cancel: CancellationToken,
}

impl PeriodicHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Scheduler spawning onto the ambient tokio runtime.
///
/// All tasks share one cancellation token, so a host can drop every task
/// it scheduled for a plugin when that plugin unloads.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    cancel: CancellationToken,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every pending and periodic task. In-flight report bodies
    /// are dropped at their next await point.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Scheduler for TokioScheduler {
    fn run_async(&self, task: TaskFuture) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = task => {}
            }
        });
    }

    fn run_delayed(&self, task: TaskFuture, delay: Duration) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = async {
                    tokio::time::sleep(delay).await;
                    task.await;
                } => {}
            }
        });
    }

    fn run_periodic_async(
        &self,
        task: RepeatingTask,
        initial_delay: Duration,
        interval: Duration,
    ) -> PeriodicHandle {
        // child of the scheduler token, so cancel_all still stops it
        let cancel = self.cancel.child_token();
        let handle = PeriodicHandle::with_token(cancel.clone());
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + initial_delay;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = task() => {}
                        }
                    }
                }
            }
        });
        handle
    }
}
