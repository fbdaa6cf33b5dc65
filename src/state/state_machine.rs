use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Players gather; participants may join and leave.
    InLobby,
    /// Roles are assigned and hiders disperse; no area enforcement.
    InGamePreparation,
    /// The hunt is running inside the arena.
    InGame,
    /// Terminal phase; ranks and stats are settled.
    Finished,
}

impl GameStatus {
    /// Whether the status ends the lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Finished)
    }

    /// Whether a phase timer is expected to run in this status.
    pub fn is_timed(self) -> bool {
        matches!(self, GameStatus::InGamePreparation | GameStatus::InGame)
    }
}

/// Indicates why the hunt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Every hider was admitted as found.
    AllHidersFound,
    /// The finish timer expired with hiders still at large.
    TimeElapsed,
}

/// Events that can be applied to a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Creator starts the game from the lobby.
    StartPreparation,
    /// Preparation timer expired.
    PreparationElapsed,
    /// End the hunt.
    Finish(FinishReason),
    /// Creator or last participant left the lobby.
    Abandon,
}

/// Outcome of a valid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The game moves to a new status.
    Status(GameStatus),
    /// The game is removed together with its participants.
    Deleted,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the game was in when the invalid event was received.
    pub from: GameStatus,
    /// The event that cannot be applied from this status.
    pub event: GameEvent,
}

/// Compute a transition from an event if the transition is valid.
pub fn compute_transition(
    from: GameStatus,
    event: GameEvent,
) -> Result<Transition, InvalidTransition> {
    let next = match (from, event) {
        (GameStatus::InLobby, GameEvent::StartPreparation) => {
            Transition::Status(GameStatus::InGamePreparation)
        }
        (GameStatus::InLobby, GameEvent::Abandon) => Transition::Deleted,
        (GameStatus::InGamePreparation, GameEvent::PreparationElapsed) => {
            Transition::Status(GameStatus::InGame)
        }
        (GameStatus::InGame, GameEvent::Finish(..)) => Transition::Status(GameStatus::Finished),
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Like [`compute_transition`], for events that never delete the game.
pub fn next_status(from: GameStatus, event: GameEvent) -> Result<GameStatus, InvalidTransition> {
    match compute_transition(from, event)? {
        Transition::Status(status) => Ok(status),
        Transition::Deleted => Err(InvalidTransition { from, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [GameStatus; 4] = [
        GameStatus::InLobby,
        GameStatus::InGamePreparation,
        GameStatus::InGame,
        GameStatus::Finished,
    ];

    const ALL_EVENTS: [GameEvent; 5] = [
        GameEvent::StartPreparation,
        GameEvent::PreparationElapsed,
        GameEvent::Finish(FinishReason::AllHidersFound),
        GameEvent::Finish(FinishReason::TimeElapsed),
        GameEvent::Abandon,
    ];

    fn rank(status: GameStatus) -> u8 {
        match status {
            GameStatus::InLobby => 0,
            GameStatus::InGamePreparation => 1,
            GameStatus::InGame => 2,
            GameStatus::Finished => 3,
        }
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut status = GameStatus::InLobby;
        for event in [
            GameEvent::StartPreparation,
            GameEvent::PreparationElapsed,
            GameEvent::Finish(FinishReason::TimeElapsed),
        ] {
            status = next_status(status, event).unwrap();
        }
        assert_eq!(status, GameStatus::Finished);
    }

    #[test]
    fn lobby_games_can_be_abandoned() {
        assert_eq!(
            compute_transition(GameStatus::InLobby, GameEvent::Abandon),
            Ok(Transition::Deleted)
        );
        for status in [
            GameStatus::InGamePreparation,
            GameStatus::InGame,
            GameStatus::Finished,
        ] {
            assert!(compute_transition(status, GameEvent::Abandon).is_err());
        }
    }

    #[test]
    fn finish_is_only_reachable_from_in_game() {
        let err = compute_transition(
            GameStatus::InGamePreparation,
            GameEvent::Finish(FinishReason::AllHidersFound),
        )
        .unwrap_err();

        assert_eq!(err.from, GameStatus::InGamePreparation);
        assert_eq!(err.event, GameEvent::Finish(FinishReason::AllHidersFound));
    }

    #[test]
    fn transitions_are_monotonic() {
        for from in ALL_STATUSES {
            for event in ALL_EVENTS {
                if let Ok(Transition::Status(to)) = compute_transition(from, event) {
                    assert_eq!(rank(to), rank(from) + 1, "{from:?} --{event:?}--> {to:?}");
                }
            }
        }
    }

    #[test]
    fn finished_is_terminal() {
        for event in ALL_EVENTS {
            assert!(compute_transition(GameStatus::Finished, event).is_err());
        }
        assert!(GameStatus::Finished.is_terminal());
    }

    #[test]
    fn abandon_is_not_a_status_change() {
        assert!(next_status(GameStatus::InLobby, GameEvent::Abandon).is_err());
    }

    #[test]
    fn status_serializes_in_screaming_snake_case() {
        let json = serde_json::to_string(&GameStatus::InGamePreparation).unwrap();
        assert_eq!(json, "\"IN_GAME_PREPARATION\"");
    }
}
