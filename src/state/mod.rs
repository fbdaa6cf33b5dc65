/// Clock abstraction used for timestamps and timers.
pub mod clock;
/// Game aggregate and participants.
pub mod game;
/// Per-game command serialization.
pub mod locks;
/// Game status transitions.
pub mod state_machine;
/// Per-game phase timers.
pub mod timers;

use std::{sync::Arc, time::Duration, time::SystemTime};

use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::GameConfig,
    dao::{
        game_store::{GameStore, ParticipantStore, memory::MemoryGameStore},
        user_store::{MemoryUserStore, UserStore},
    },
    error::ServiceError,
};

use self::{
    clock::Clock,
    game::GameId,
    locks::{GameGuard, GameLocks},
    timers::{TimerEvents, TimerRegistry},
};

/// Shared, reference-counted application state.
pub type SharedState = Arc<AppState>;
/// How long a command waits for the per-game lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage collaborators used by the coordinator.
#[derive(Clone)]
pub struct Stores {
    /// Game aggregate store.
    pub games: Arc<dyn GameStore>,
    /// Participant lookups.
    pub participants: Arc<dyn ParticipantStore>,
    /// User registry.
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Wire the in-memory stores; the same game store serves both aggregates.
    pub fn in_memory(games: MemoryGameStore, users: MemoryUserStore) -> Self {
        Self {
            games: Arc::new(games.clone()),
            participants: Arc::new(games),
            users: Arc::new(users),
        }
    }
}

/// Central application state shared by every command handler.
pub struct AppState {
    config: GameConfig,
    stores: Stores,
    clock: Arc<dyn Clock>,
    timers: TimerRegistry,
    locks: GameLocks,
    lock_timeout: Duration,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`], together with the receiver of
    /// timer expiries that must be handed to the dispatcher.
    pub fn new(
        config: GameConfig,
        stores: Stores,
        clock: Arc<dyn Clock>,
    ) -> (SharedState, TimerEvents) {
        let (timers, events) = TimerRegistry::new(Arc::clone(&clock));
        let state = Arc::new(Self {
            config,
            stores,
            clock,
            timers,
            locks: GameLocks::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        });
        (state, events)
    }

    /// Loaded game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Game aggregate store.
    pub fn games(&self) -> &Arc<dyn GameStore> {
        &self.stores.games
    }

    /// Participant lookups.
    pub fn participants(&self) -> &Arc<dyn ParticipantStore> {
        &self.stores.participants
    }

    /// User registry.
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.stores.users
    }

    /// Phase timers of every game.
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Per-game locks.
    pub fn locks(&self) -> &GameLocks {
        &self.locks
    }

    /// Current time according to the shared clock.
    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    /// Acquire the advisory lock of `game_id`, giving up after the configured timeout.
    pub async fn lock_game(&self, game_id: GameId) -> Result<GameGuard, ServiceError> {
        match timeout(self.lock_timeout, self.locks.acquire(game_id)).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!(game_id = %game_id, "timed out waiting for game lock");
                Err(ServiceError::Timeout)
            }
        }
    }
}
