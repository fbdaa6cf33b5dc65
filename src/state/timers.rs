use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::state::{
    clock::{Clock, ScheduledTask},
    game::GameId,
};

/// Which phase a timer closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPhase {
    /// Closes the preparation phase.
    Preparation,
    /// Closes the hunt.
    Finish,
}

/// Synthetic command emitted when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    /// Game whose timer fired.
    pub game_id: GameId,
    /// Phase the timer closed.
    pub phase: TimerPhase,
    /// Identifier of the firing timer, for log correlation.
    pub timer_id: Uuid,
}

/// Public view of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimerInfo {
    /// Phase the timer will close.
    pub phase: TimerPhase,
    /// Wall-clock time the timer fires.
    pub deadline: SystemTime,
}

/// Receiving side of the expiry channel.
pub type TimerEvents = mpsc::UnboundedReceiver<TimerExpired>;

struct ArmedTimer {
    id: Uuid,
    phase: TimerPhase,
    task: ScheduledTask,
}

/// One timer slot per game. Never touches game state: a fired timer only enqueues a
/// [`TimerExpired`] command.
pub struct TimerRegistry {
    clock: Arc<dyn Clock>,
    slots: Arc<DashMap<GameId, ArmedTimer>>,
    tx: mpsc::UnboundedSender<TimerExpired>,
}

impl TimerRegistry {
    /// Build a registry and the receiver its expiries are delivered to.
    pub fn new(clock: Arc<dyn Clock>) -> (Self, TimerEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Self {
            clock,
            slots: Arc::new(DashMap::new()),
            tx,
        };
        (registry, rx)
    }

    /// Arm (or re-arm) the preparation timer of `game_id`.
    pub fn arm_preparation(&self, game_id: GameId, delay_seconds: u32) {
        self.arm(game_id, TimerPhase::Preparation, delay_seconds);
    }

    /// Arm (or re-arm) the finish timer of `game_id`.
    pub fn arm_finish(&self, game_id: GameId, delay_seconds: u32) {
        self.arm(game_id, TimerPhase::Finish, delay_seconds);
    }

    /// Arm (or re-arm) the timer of `game_id` for `phase`.
    pub fn arm(&self, game_id: GameId, phase: TimerPhase, delay_seconds: u32) {
        let timer_id = Uuid::new_v4();
        let delay = Duration::from_secs(u64::from(delay_seconds));

        // The entry guard is held while scheduling so the task cannot free a slot
        // that does not hold it yet.
        let entry = self.slots.entry(game_id);
        let slots = Arc::clone(&self.slots);
        let tx = self.tx.clone();
        let task = self.clock.schedule(
            delay,
            Box::pin(async move {
                let owned = slots
                    .remove_if(&game_id, |_, armed| armed.id == timer_id)
                    .is_some();
                if owned {
                    let _ = tx.send(TimerExpired {
                        game_id,
                        phase,
                        timer_id,
                    });
                }
            }),
        );
        let armed = ArmedTimer {
            id: timer_id,
            phase,
            task,
        };

        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(armed);
                previous.task.cancel();
                debug!(
                    game_id = %game_id,
                    replaced = ?previous.phase,
                    phase = ?phase,
                    "re-armed game timer"
                );
            }
            Entry::Vacant(vacant) => {
                vacant.insert(armed);
                debug!(game_id = %game_id, phase = ?phase, delay_seconds, "armed game timer");
            }
        }
    }

    /// Cancel whatever timer is armed for `game_id`. Idempotent.
    pub fn cancel(&self, game_id: GameId) {
        if let Some((_, armed)) = self.slots.remove(&game_id) {
            armed.task.cancel();
            debug!(game_id = %game_id, phase = ?armed.phase, "cancelled game timer");
        }
    }

    /// Timer currently armed for `game_id`, if any.
    pub fn armed(&self, game_id: GameId) -> Option<ArmedTimerInfo> {
        self.slots.get(&game_id).map(|armed| ArmedTimerInfo {
            phase: armed.phase,
            deadline: armed.task.deadline(),
        })
    }

    /// Cancel every armed timer, returning how many were pending.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.slots.retain(|_, armed| {
            armed.task.cancel();
            cancelled += 1;
            false
        });
        cancelled
    }
}
