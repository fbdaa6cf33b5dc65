use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, ParticipantEntity, UserEntity},
    geo::GeoPoint,
    state::state_machine::GameStatus,
};

/// Identifier of a game.
pub type GameId = Uuid;
/// Identifier of a participant.
pub type ParticipantId = Uuid;
/// Identifier of a registered user.
pub type UserId = Uuid;

/// Role held once preparation begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    /// Chases the hiders and owns the arena.
    Hunter,
    /// Hides until found.
    Hider,
}

/// Per-participant progress through a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantState {
    /// Waiting in the lobby.
    Lobby,
    /// Hider still at large.
    Hiding,
    /// The hunter.
    Hunting,
    /// Hider admitted as caught.
    Found,
}

/// Player bound to a game.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Stable identifier for the participant.
    pub id: ParticipantId,
    /// Owning game.
    pub game_id: GameId,
    /// Bound user; `None` once the game finished.
    pub user_id: Option<UserId>,
    /// Username snapshot taken at join time.
    pub display_name: String,
    /// Avatar snapshot taken at join time.
    pub display_picture: Option<String>,
    /// Unset while in the lobby.
    pub role: Option<ParticipantRole>,
    /// Lifecycle state.
    pub state: ParticipantState,
    /// Last reported position.
    pub position: GeoPoint,
    /// Whether the last in-game position was outside the arena.
    pub out_of_area: bool,
    /// When the hider was admitted as found.
    pub found_at: Option<SystemTime>,
    /// Final rank, set when the game finishes.
    pub rank: Option<u32>,
    /// When the participant joined.
    pub joined_at: SystemTime,
}

impl Participant {
    /// New lobby participant for `user`.
    pub fn join(game_id: GameId, user: &UserEntity, position: GeoPoint, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            user_id: Some(user.id),
            display_name: user.username.clone(),
            display_picture: user.display_picture.clone(),
            role: None,
            state: ParticipantState::Lobby,
            position,
            out_of_area: false,
            found_at: None,
            rank: None,
            joined_at: now,
        }
    }

    /// Whether the participant was assigned the hunter role.
    pub fn is_hunter(&self) -> bool {
        self.role == Some(ParticipantRole::Hunter)
    }

    /// Whether the participant was assigned the hider role.
    pub fn is_hider(&self) -> bool {
        self.role == Some(ParticipantRole::Hider)
    }
}

/// Values chosen by the creator.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Display name of the game.
    pub name: String,
    /// Initial arena radius in metres.
    pub radius_meters: f64,
    /// Length of the preparation phase.
    pub preparation_seconds: u32,
    /// Length of the hunt.
    pub game_seconds: u32,
}

/// Aggregate root: one game and its participants in join order.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    /// Primary key of the game.
    pub id: GameId,
    /// Display name, unique among non-finished games.
    pub name: String,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Arena centre.
    pub centre: Option<GeoPoint>,
    /// Arena radius in metres.
    pub radius_meters: Option<f64>,
    /// Length of the preparation phase.
    pub preparation_seconds: u32,
    /// Length of the hunt.
    pub game_seconds: u32,
    /// Participant that created the game.
    pub creator_participant_id: ParticipantId,
    /// Set whenever a timed phase begins.
    pub phase_started_at: Option<SystemTime>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last persisted change.
    pub updated_at: SystemTime,
    /// Version of the stored aggregate this value was loaded from.
    pub version: u64,
    /// Participants keyed by id, in join order.
    pub participants: IndexMap<ParticipantId, Participant>,
}

impl Game {
    /// Build a lobby game whose only participant is the creator.
    pub fn new(
        settings: GameSettings,
        creator: &UserEntity,
        position: GeoPoint,
        now: SystemTime,
    ) -> Self {
        let id = Uuid::new_v4();
        let participant = Participant::join(id, creator, position, now);
        let creator_participant_id = participant.id;

        let mut participants = IndexMap::new();
        participants.insert(participant.id, participant);

        Self {
            id,
            name: settings.name,
            status: GameStatus::InLobby,
            centre: Some(position),
            radius_meters: Some(settings.radius_meters),
            preparation_seconds: settings.preparation_seconds,
            game_seconds: settings.game_seconds,
            creator_participant_id,
            phase_started_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
            participants,
        }
    }

    /// Participant bound to `user_id`, if any.
    pub fn participant_for_user(&self, user_id: UserId) -> Option<&Participant> {
        self.participants
            .values()
            .find(|participant| participant.user_id == Some(user_id))
    }

    /// Mutable participant bound to `user_id`, if any.
    pub fn participant_for_user_mut(&mut self, user_id: UserId) -> Option<&mut Participant> {
        self.participants
            .values_mut()
            .find(|participant| participant.user_id == Some(user_id))
    }

    /// Whether `user_id` owns the creator participant.
    pub fn is_creator(&self, user_id: UserId) -> bool {
        self.participant_for_user(user_id)
            .is_some_and(|participant| participant.id == self.creator_participant_id)
    }

    /// The hunter, once roles are assigned.
    pub fn hunter(&self) -> Option<&Participant> {
        self.participants.values().find(|p| p.is_hunter())
    }

    /// Hiders in join order.
    pub fn hiders(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values().filter(|p| p.is_hider())
    }

    /// True when no hider is left hiding.
    pub fn all_hiders_found(&self) -> bool {
        self.hiders()
            .all(|hider| hider.state == ParticipantState::Found)
    }

    /// Describe the first broken structural invariant, if any.
    ///
    /// Covers participant count, creator presence, role distribution in the timed phases,
    /// `phase_started_at` presence and the user detachment of finished games.
    pub fn invariant_violation(&self, max_participants: usize) -> Option<String> {
        let count = self.participants.len();
        if count == 0 || count > max_participants {
            return Some(format!("participant count {count} out of [1, {max_participants}]"));
        }
        if !self.participants.contains_key(&self.creator_participant_id) {
            return Some("creator participant missing".into());
        }
        if self.participants.values().any(|p| p.game_id != self.id) {
            return Some("participant bound to another game".into());
        }
        if self.status.is_timed() {
            let hunters = self.participants.values().filter(|p| p.is_hunter()).count();
            if hunters != 1 {
                return Some(format!("expected exactly one hunter, found {hunters}"));
            }
            if self
                .participants
                .values()
                .any(|p| !p.is_hunter() && !p.is_hider())
            {
                return Some("participant without role in a started game".into());
            }
            if self.phase_started_at.is_none() {
                return Some("phase start missing in a timed phase".into());
            }
        }
        if self.status.is_terminal() {
            if self.participants.values().any(|p| p.user_id.is_some()) {
                return Some("finished game still bound to a user".into());
            }
            if self.participants.values().any(|p| p.rank.is_none()) {
                return Some("finished game with unranked participant".into());
            }
        }
        None
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            user_id: value.user_id,
            display_name: value.display_name,
            display_picture: value.display_picture,
            role: value.role,
            state: value.state,
            position: value.position,
            out_of_area: value.out_of_area,
            found_at: value.found_at,
            rank: value.rank,
            joined_at: value.joined_at,
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            user_id: value.user_id,
            display_name: value.display_name,
            display_picture: value.display_picture,
            role: value.role,
            state: value.state,
            position: value.position,
            out_of_area: value.out_of_area,
            found_at: value.found_at,
            rank: value.rank,
            joined_at: value.joined_at,
        }
    }
}

impl From<GameEntity> for Game {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            status: entity.status,
            centre: entity.centre,
            radius_meters: entity.radius_meters,
            preparation_seconds: entity.preparation_seconds,
            game_seconds: entity.game_seconds,
            creator_participant_id: entity.creator_participant_id,
            phase_started_at: entity.phase_started_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            version: entity.version,
            participants: entity
                .participants
                .into_iter()
                .map(|participant| (participant.id, participant.into()))
                .collect(),
        }
    }
}

impl From<Game> for GameEntity {
    fn from(game: Game) -> Self {
        Self {
            id: game.id,
            name: game.name,
            status: game.status,
            centre: game.centre,
            radius_meters: game.radius_meters,
            preparation_seconds: game.preparation_seconds,
            game_seconds: game.game_seconds,
            creator_participant_id: game.creator_participant_id,
            phase_started_at: game.phase_started_at,
            created_at: game.created_at,
            updated_at: game.updated_at,
            version: game.version,
            participants: game.participants.into_values().map(Into::into).collect(),
        }
    }
}
