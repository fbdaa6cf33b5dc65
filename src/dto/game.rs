use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{format_system_time, validation::validate_game_name},
    geo::GeoPoint,
    state::{
        game::{Game, Participant, ParticipantRole, ParticipantState},
        state_machine::GameStatus,
    },
};

/// Payload used to create a brand-new game in the lobby.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Game name, unique among non-finished games.
    pub name: String,
    /// Requested arena radius in meters.
    pub radius_meters: f64,
    /// Falls back to 30 seconds when omitted.
    #[serde(default)]
    pub preparation_seconds: Option<u32>,
    /// Falls back to 300 seconds when omitted.
    #[serde(default)]
    pub game_seconds: Option<u32>,
    /// Creator position, also the displayed arena centre until roles are assigned.
    pub position: GeoPoint,
}

impl Validate for CreateGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_game_name(&self.name) {
            errors.add("name", e);
        }
        if !self.radius_meters.is_finite() {
            let mut err = ValidationError::new("radius_finite");
            err.message = Some("Radius must be a finite number".into());
            errors.add("radius_meters", err);
        }
        if let Err(position_errors) = self.position.validate() {
            errors.merge_self("position", Err(position_errors));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Position report sent to the join / update endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionRequest {
    /// Reported position.
    #[validate(nested)]
    pub position: GeoPoint,
    /// Ask to leave the lobby; honoured for the creator only.
    #[serde(default)]
    pub start_game: bool,
}

/// New arena centre proposed by the hunter.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCentreRequest {
    /// Proposed arena centre.
    #[validate(nested)]
    pub centre: GeoPoint,
}

/// Public projection of a game.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Game id.
    pub id: Uuid,
    /// Game name.
    pub name: String,
    /// Current status.
    pub status: GameStatus,
    /// Arena centre, set once roles are assigned.
    pub centre: Option<GeoPoint>,
    /// Arena radius in meters, set once roles are assigned.
    pub radius_meters: Option<f64>,
    /// Preparation phase length.
    pub preparation_seconds: u32,
    /// Hunt length.
    pub game_seconds: u32,
    /// Participant that created the game.
    pub creator_participant_id: Uuid,
    /// RFC 3339 start of the current timed phase.
    pub phase_started_at: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
    /// Participants in join order.
    pub participants: Vec<ParticipantSnapshot>,
}

/// Public projection of a participant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    /// Participant id.
    pub id: Uuid,
    /// Game the participant belongs to.
    pub game_id: Uuid,
    /// `None` once the game finished.
    pub user_id: Option<Uuid>,
    /// Name shown to the other players.
    pub display_name: String,
    /// Avatar URL.
    pub display_picture: Option<String>,
    /// Role, absent in the lobby.
    pub role: Option<ParticipantRole>,
    /// Lifecycle state.
    pub state: ParticipantState,
    /// Last reported position.
    pub position: GeoPoint,
    /// Whether the last position lies outside the arena.
    pub out_of_area: bool,
    /// RFC 3339 time the hider was found.
    pub found_at: Option<String>,
    /// Final rank once the game finished.
    pub rank: Option<u32>,
    /// RFC 3339 join time.
    pub joined_at: String,
}

impl From<&Participant> for ParticipantSnapshot {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            game_id: participant.game_id,
            user_id: participant.user_id,
            display_name: participant.display_name.clone(),
            display_picture: participant.display_picture.clone(),
            role: participant.role,
            state: participant.state,
            position: participant.position,
            out_of_area: participant.out_of_area,
            found_at: participant.found_at.map(format_system_time),
            rank: participant.rank,
            joined_at: format_system_time(participant.joined_at),
        }
    }
}

impl From<&Game> for GameSnapshot {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            name: game.name.clone(),
            status: game.status,
            centre: game.centre,
            radius_meters: game.radius_meters,
            preparation_seconds: game.preparation_seconds,
            game_seconds: game.game_seconds,
            creator_participant_id: game.creator_participant_id,
            phase_started_at: game.phase_started_at.map(format_system_time),
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
            participants: game.participants.values().map(Into::into).collect(),
        }
    }
}

impl From<Game> for GameSnapshot {
    fn from(game: Game) -> Self {
        Self::from(&game)
    }
}

impl GameSnapshot {
    /// Participant bound to `user_id`, if any.
    pub fn participant_for_user(&self, user_id: Uuid) -> Option<&ParticipantSnapshot> {
        self.participants
            .iter()
            .find(|participant| participant.user_id == Some(user_id))
    }

    /// Participant by id.
    pub fn participant(&self, id: Uuid) -> Option<&ParticipantSnapshot> {
        self.participants.iter().find(|participant| participant.id == id)
    }

    /// The hunter, once roles are assigned.
    pub fn hunter(&self) -> Option<&ParticipantSnapshot> {
        self.participants
            .iter()
            .find(|participant| participant.role == Some(ParticipantRole::Hunter))
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{dao::models::UserEntity, state::game::GameSettings};

    fn create_request(name: &str) -> CreateGameRequest {
        CreateGameRequest {
            name: name.into(),
            radius_meters: 50.0,
            preparation_seconds: None,
            game_seconds: None,
            position: GeoPoint::new(47.0, 8.0),
        }
    }

    #[test]
    fn create_request_validation() {
        assert!(create_request("G").validate().is_ok());
        assert!(create_request(" ").validate().is_err());

        let mut request = create_request("G");
        request.radius_meters = f64::NAN;
        assert!(request.validate().is_err());

        let mut request = create_request("G");
        request.position = GeoPoint::new(95.0, 8.0);
        let errors = request.validate().unwrap_err();
        assert!(errors.errors().contains_key("position"));
    }

    #[test]
    fn update_position_defaults_start_game_to_false() {
        let request: UpdatePositionRequest =
            serde_json::from_str(r#"{ "position": { "latitude": 47.0, "longitude": 8.0 } }"#)
                .unwrap();
        assert!(!request.start_game);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn create_request_reads_camel_case() {
        let request: CreateGameRequest = serde_json::from_str(
            r#"{
                "name": "G",
                "radiusMeters": 50,
                "preparationSeconds": 30,
                "position": { "latitude": 47.0, "longitude": 8.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(request.preparation_seconds, Some(30));
        assert_eq!(request.game_seconds, None);
    }

    #[test]
    fn snapshot_renders_rfc3339_and_screaming_case() {
        let creator = UserEntity::new("alice");
        let game = Game::new(
            GameSettings {
                name: "G".into(),
                radius_meters: 50.0,
                preparation_seconds: 30,
                game_seconds: 300,
            },
            &creator,
            GeoPoint::new(47.0, 8.0),
            SystemTime::UNIX_EPOCH,
        );

        let snapshot = GameSnapshot::from(&game);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["status"], "IN_LOBBY");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["participants"][0]["state"], "LOBBY");
        assert_eq!(
            snapshot.participant_for_user(creator.id).map(|p| p.id),
            Some(game.creator_participant_id)
        );
    }
}
