use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::{StorageError, UniqueConstraint},
    state::state_machine::InvalidTransition,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Addressed game or participant does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Command illegal in the current status.
    #[error("wrong phase: {0}")]
    WrongPhase(String),
    /// Game name taken by a non-finished game.
    #[error("a game named `{0}` is already running")]
    NameConflict(String),
    /// Preparation/game seconds or radius out of the configured range.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
    /// Payload failed structural validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// User already owns a participant in this game or another one.
    #[error("user is already participating in a game")]
    AlreadyParticipant,
    /// User is bound to a different non-finished game.
    #[error("user is already participating in another game")]
    ConflictingGame,
    /// Participant cap reached.
    #[error("game is full")]
    GameFull,
    /// Caller does not own a participant in the game.
    #[error("user is not a participant of this game")]
    NotParticipant,
    /// Caller is not the hunter.
    #[error("only the hunter may do this")]
    NotHunter,
    /// Caller asked to start a game they did not create.
    #[error("only the creator may start the game")]
    OnlyCreatorMayStart,
    /// Creator asked to start with too few participants.
    #[error("at least {required} participants are needed to start, found {actual}")]
    NotEnoughParticipants {
        /// Configured minimum.
        required: usize,
        /// Participants currently in the lobby.
        actual: usize,
    },
    /// Proposed centre lies farther than the radius from the current centre.
    #[error("new centre is outside of the arena")]
    CentreOutOfArea,
    /// Target participant was already admitted as found.
    #[error("participant was already found")]
    AlreadyFound,
    /// Lobby-only command sent to a started game.
    #[error("game has already started")]
    AlreadyStarted,
    /// Per-game lock not acquired in time.
    #[error("operation timed out")]
    Timeout,
    /// Storage backend failure.
    #[error("internal storage error")]
    Internal(#[source] StorageError),
}

impl ServiceError {
    /// Whether the same command may succeed when tried again later.
    ///
    /// Lock timeouts, unreachable backends and lost version races are transient;
    /// everything else fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout
                | ServiceError::Internal(StorageError::Unavailable { .. })
                | ServiceError::Internal(StorageError::Conflict {
                    constraint: UniqueConstraint::GameVersion,
                    ..
                })
        )
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict {
                constraint: UniqueConstraint::ActiveGameName,
                key,
            } => ServiceError::NameConflict(key),
            StorageError::Conflict {
                constraint: UniqueConstraint::ActiveParticipantUser,
                ..
            } => ServiceError::ConflictingGame,
            other => ServiceError::Internal(other),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::WrongPhase(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{GameEvent, GameStatus};

    #[test]
    fn unique_violations_map_to_domain_errors() {
        let name = ServiceError::from(StorageError::conflict(
            UniqueConstraint::ActiveGameName,
            "G",
        ));
        assert!(matches!(name, ServiceError::NameConflict(key) if key == "G"));

        let user = ServiceError::from(StorageError::conflict(
            UniqueConstraint::ActiveParticipantUser,
            "u",
        ));
        assert!(matches!(user, ServiceError::ConflictingGame));

        let version = ServiceError::from(StorageError::conflict(
            UniqueConstraint::GameVersion,
            "g v2",
        ));
        assert!(matches!(version, ServiceError::Internal(_)));
    }

    #[test]
    fn only_backend_and_lock_failures_are_transient() {
        let unavailable = ServiceError::from(StorageError::unavailable(
            "save game".into(),
            std::io::Error::other("connection reset"),
        ));
        assert!(unavailable.is_transient());
        assert!(ServiceError::Timeout.is_transient());
        assert!(
            ServiceError::from(StorageError::conflict(UniqueConstraint::GameVersion, "g v2"))
                .is_transient()
        );

        assert!(!ServiceError::from(StorageError::corrupted("no creator")).is_transient());
        assert!(!ServiceError::WrongPhase("finished".into()).is_transient());
        assert!(!ServiceError::NotFound("game".into()).is_transient());
    }

    #[test]
    fn invalid_transition_is_a_wrong_phase() {
        let err = ServiceError::from(InvalidTransition {
            from: GameStatus::Finished,
            event: GameEvent::StartPreparation,
        });
        assert!(matches!(err, ServiceError::WrongPhase(_)));
    }
}
