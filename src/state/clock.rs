use std::time::{Duration, SystemTime};

use futures::future::BoxFuture;
use tokio::{task::JoinHandle, time::Instant};

/// Source of time and one-shot scheduling for the coordinator.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> ScheduledTask;
}

/// Handle to a task scheduled through a [`Clock`].
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    deadline: SystemTime,
}

impl ScheduledTask {
    /// Wall-clock time at which the task runs.
    pub fn deadline(&self) -> SystemTime {
        self.deadline
    }

    /// Abort the task; a no-op once it ran.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task ran to completion or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// [`Clock`] backed by the tokio timer wheel.
///
/// Wall time is a fixed origin plus the tokio monotonic clock, so pausing or advancing
/// tokio time in tests moves timestamps and deadlines together.
#[derive(Debug, Clone)]
pub struct TokioClock {
    wall_origin: SystemTime,
    origin: Instant,
}

impl TokioClock {
    /// Clock anchored at the current wall time.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Clock whose `now()` reads `wall_origin` at creation.
    pub fn starting_at(wall_origin: SystemTime) -> Self {
        Self {
            wall_origin,
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> SystemTime {
        self.wall_origin + self.origin.elapsed()
    }

    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> ScheduledTask {
        let deadline = self.now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        ScheduledTask { handle, deadline }
    }
}
