use std::{collections::HashMap, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    geo::GeoPoint,
    state::{
        game::{ParticipantRole, ParticipantState},
        state_machine::GameStatus,
    },
};

/// Aggregate game entity persisted by the storage layer, participants included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name, unique among non-finished games.
    pub name: String,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Arena centre; set at creation for display and moved by the hunter.
    pub centre: Option<GeoPoint>,
    /// Arena radius in metres.
    pub radius_meters: Option<f64>,
    /// Length of the preparation phase.
    pub preparation_seconds: u32,
    /// Length of the in-game phase.
    pub game_seconds: u32,
    /// Participant that created the game.
    pub creator_participant_id: Uuid,
    /// Start of the current timed phase.
    pub phase_started_at: Option<SystemTime>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
    /// Optimistic concurrency counter, bumped on every save.
    pub version: u64,
    /// Participants in join order.
    pub participants: Vec<ParticipantEntity>,
}

/// Participant row; `game_id` and `user_id` are indexed by backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantEntity {
    /// Primary key.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Bound user; cleared once the game finishes.
    pub user_id: Option<Uuid>,
    /// Name shown to the other players.
    pub display_name: String,
    /// Avatar URL copied from the user record.
    pub display_picture: Option<String>,
    /// Assigned when the game leaves the lobby.
    pub role: Option<ParticipantRole>,
    /// Lifecycle state.
    pub state: ParticipantState,
    /// Last reported position.
    pub position: GeoPoint,
    /// Whether the last position lies outside the arena.
    pub out_of_area: bool,
    /// When the hider was admitted as found.
    pub found_at: Option<SystemTime>,
    /// Final rank, set when the game finishes.
    pub rank: Option<u32>,
    /// When the participant joined.
    pub joined_at: SystemTime,
}

/// User record owned by the user registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Primary key.
    pub id: Uuid,
    /// Login name, also used as the default display name.
    pub username: String,
    /// Optional avatar URL.
    pub display_picture: Option<String>,
    /// Free-form string counters (`gamesPlayed`, `wins`, `points`, ...).
    pub stats: HashMap<String, String>,
}

impl UserEntity {
    /// Fresh user with empty stats.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            display_picture: None,
            stats: HashMap::new(),
        }
    }
}
