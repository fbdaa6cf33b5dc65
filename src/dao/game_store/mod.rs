/// Process-local store used by the binary and the test-suite.
pub mod memory;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameEntity, ParticipantEntity},
        storage::StorageResult,
    },
    state::state_machine::GameStatus,
};

/// Abstraction over the persistence layer for game aggregates.
///
/// Writing a game writes its participants in the same transaction; participants missing
/// from the written aggregate are deleted.
pub trait GameStore: Send + Sync {
    /// Insert or replace a game together with its participants.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a full aggregate.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Remove a game and its participants, reporting whether it existed.
    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Games currently in `status`, oldest first.
    fn find_games_by_status(
        &self,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Games in any status but `status`, oldest first.
    fn find_games_where_status_not(
        &self,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// The non-finished game carrying `name`, if any.
    fn find_active_game_by_name(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
}

/// Read access to participant rows.
pub trait ParticipantStore: Send + Sync {
    /// Participant by id, whatever the status of its game.
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// The participant bound to `user_id` in a non-finished game.
    fn find_participant_by_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Participants of a game in join order; empty when the game does not exist.
    fn find_participants_by_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
}
