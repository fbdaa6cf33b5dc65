use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::state::game::GameId;

type LockTable = DashMap<GameId, Arc<Mutex<()>>>;

/// Per-game advisory locks serializing every read-modify-persist cycle on a game.
#[derive(Clone, Default)]
pub struct GameLocks {
    table: Arc<LockTable>,
}

impl GameLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `game_id`.
    pub async fn acquire(&self, game_id: GameId) -> GameGuard {
        let lock = self.table.entry(game_id).or_default().clone();
        let guard = lock.lock_owned().await;
        GameGuard {
            game_id,
            table: Arc::clone(&self.table),
            guard: Some(guard),
            retire: false,
        }
    }

    /// Number of games with a lock entry.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no game currently has a lock entry.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Exclusive access to one game, released on drop.
pub struct GameGuard {
    game_id: GameId,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
    retire: bool,
}

impl GameGuard {
    /// Game this guard locks.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Drop the lock entry on release when no other command holds or awaits it.
    ///
    /// Used once the game is deleted or finished.
    pub fn retire(&mut self) {
        self.retire = true;
    }
}

impl Drop for GameGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        if self.retire {
            self.table
                .remove_if(&self.game_id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}
