use tracing::{debug, info};
use validator::Validate;

use crate::{
    config::{DEFAULT_GAME_SECONDS, DEFAULT_PREPARATION_SECONDS},
    dao::models::UserEntity,
    dto::game::{
        CreateGameRequest, GameSnapshot, ParticipantSnapshot, UpdateCentreRequest,
        UpdatePositionRequest,
    },
    error::ServiceError,
    geo::{self, GeoPoint},
    services::lifecycle,
    state::{
        SharedState,
        game::{Game, GameId, GameSettings, Participant, ParticipantId, ParticipantState, UserId},
        locks::GameGuard,
        state_machine::{FinishReason, GameEvent, GameStatus, Transition, compute_transition},
    },
};

/// Games still waiting in the lobby.
pub async fn list_joinable_games(state: &SharedState) -> Result<Vec<GameSnapshot>, ServiceError> {
    let games = state
        .games()
        .find_games_by_status(GameStatus::InLobby)
        .await?;
    Ok(games
        .into_iter()
        .map(|entity| Game::from(entity).into())
        .collect())
}

/// Every game that has not finished yet.
pub async fn list_active_games(state: &SharedState) -> Result<Vec<GameSnapshot>, ServiceError> {
    let games = state
        .games()
        .find_games_where_status_not(GameStatus::Finished)
        .await?;
    Ok(games
        .into_iter()
        .map(|entity| Game::from(entity).into())
        .collect())
}

/// Snapshot of one game.
pub async fn get_game(state: &SharedState, game_id: GameId) -> Result<GameSnapshot, ServiceError> {
    let game = load_game(state, game_id)
        .await?
        .ok_or_else(|| game_not_found(game_id))?;
    Ok(game.into())
}

/// Participants of a game in join order.
pub async fn list_participants(
    state: &SharedState,
    game_id: GameId,
) -> Result<Vec<ParticipantSnapshot>, ServiceError> {
    let participants = state
        .participants()
        .find_participants_by_game(game_id)
        .await?;
    if participants.is_empty() {
        return Err(game_not_found(game_id));
    }
    Ok(participants
        .into_iter()
        .map(|entity| ParticipantSnapshot::from(&Participant::from(entity)))
        .collect())
}

/// Whether `user_id` could start `game_id` right now.
pub async fn can_start_game(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
) -> Result<bool, ServiceError> {
    let game = load_game(state, game_id)
        .await?
        .ok_or_else(|| game_not_found(game_id))?;
    Ok(game.status == GameStatus::InLobby
        && game.is_creator(user_id)
        && game.participants.len() >= state.config().min_to_start)
}

/// Create a lobby game whose first participant is the caller.
pub async fn create_game(
    state: &SharedState,
    user_id: UserId,
    request: CreateGameRequest,
) -> Result<GameSnapshot, ServiceError> {
    request.validate()?;
    let user = load_user(state, user_id).await?;

    if state
        .participants()
        .find_participant_by_user(user_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::AlreadyParticipant);
    }

    let name = request.name.trim().to_owned();
    if state
        .games()
        .find_active_game_by_name(name.clone())
        .await?
        .is_some()
    {
        return Err(ServiceError::NameConflict(name));
    }

    let settings = check_settings(state, name, &request)?;
    let mut game = Game::new(settings, &user, request.position, state.now());

    let _guard = state.lock_game(game.id).await?;
    persist(state, &mut game).await.map_err(|err| match err {
        ServiceError::ConflictingGame => ServiceError::AlreadyParticipant,
        other => other,
    })?;

    info!(
        game_id = %game.id,
        user_id = %user_id,
        name = %game.name,
        "game created"
    );
    Ok(game.into())
}

fn check_settings(
    state: &SharedState,
    name: String,
    request: &CreateGameRequest,
) -> Result<GameSettings, ServiceError> {
    let config = state.config();

    let preparation_seconds = request
        .preparation_seconds
        .unwrap_or(DEFAULT_PREPARATION_SECONDS);
    if !config.preparation_seconds.contains(preparation_seconds) {
        return Err(ServiceError::InvalidBounds(format!(
            "Preparation time must be between {} and {} seconds",
            config.preparation_seconds.min, config.preparation_seconds.max
        )));
    }

    let game_seconds = request.game_seconds.unwrap_or(DEFAULT_GAME_SECONDS);
    if !config.game_seconds.contains(game_seconds) {
        return Err(ServiceError::InvalidBounds(format!(
            "Game time must be between {} and {} seconds",
            config.game_seconds.min, config.game_seconds.max
        )));
    }

    if !config.radius_meters.contains(request.radius_meters) {
        return Err(ServiceError::InvalidBounds(format!(
            "Radius must be between {} and {} meters",
            config.radius_meters.min, config.radius_meters.max
        )));
    }

    Ok(GameSettings {
        name,
        radius_meters: request.radius_meters,
        preparation_seconds,
        game_seconds,
    })
}

/// Join a lobby game at the given position.
pub async fn join_game(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
    request: UpdatePositionRequest,
) -> Result<GameSnapshot, ServiceError> {
    request.validate()?;
    let mut guard = state.lock_game(game_id).await?;
    let mut game = load_locked(state, &mut guard, game_id).await?;

    join_locked(state, &mut game, user_id, request.position).await?;
    Ok(game.into())
}

/// Report a position; the creator may also ask to start the game from the lobby.
pub async fn update_position(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
    request: UpdatePositionRequest,
) -> Result<GameSnapshot, ServiceError> {
    request.validate()?;
    let mut guard = state.lock_game(game_id).await?;
    let mut game = load_locked(state, &mut guard, game_id).await?;

    update_position_locked(state, &mut game, user_id, request).await?;
    Ok(game.into())
}

/// Combined endpoint: a lobby visitor without `startGame` joins, everybody else reports a position.
pub async fn update_game(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
    request: UpdatePositionRequest,
) -> Result<GameSnapshot, ServiceError> {
    request.validate()?;
    let mut guard = state.lock_game(game_id).await?;
    let mut game = load_locked(state, &mut guard, game_id).await?;

    let joining = game.status == GameStatus::InLobby
        && !request.start_game
        && game.participant_for_user(user_id).is_none();
    if joining {
        join_locked(state, &mut game, user_id, request.position).await?;
    } else {
        update_position_locked(state, &mut game, user_id, request).await?;
    }
    Ok(game.into())
}

async fn join_locked(
    state: &SharedState,
    game: &mut Game,
    user_id: UserId,
    position: GeoPoint,
) -> Result<(), ServiceError> {
    if game.status != GameStatus::InLobby {
        return Err(ServiceError::WrongPhase(
            "players can only join while the game is in the lobby".into(),
        ));
    }
    if game.participant_for_user(user_id).is_some() {
        return Err(ServiceError::AlreadyParticipant);
    }
    if game.participants.len() >= state.config().max_participants {
        return Err(ServiceError::GameFull);
    }
    if state
        .participants()
        .find_participant_by_user(user_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::ConflictingGame);
    }

    let user = load_user(state, user_id).await?;
    let participant = Participant::join(game.id, &user, position, state.now());
    let participant_id = participant.id;
    game.participants.insert(participant_id, participant);
    persist(state, game).await?;

    info!(
        game_id = %game.id,
        user_id = %user_id,
        participant_id = %participant_id,
        participants = game.participants.len(),
        "player joined game"
    );
    Ok(())
}

async fn update_position_locked(
    state: &SharedState,
    game: &mut Game,
    user_id: UserId,
    request: UpdatePositionRequest,
) -> Result<(), ServiceError> {
    if game.status == GameStatus::Finished {
        return Err(ServiceError::WrongPhase("game has already finished".into()));
    }

    let config = state.config();
    let is_creator = game.is_creator(user_id);
    let status = game.status;
    let centre = game.centre;
    let radius = game.radius_meters;
    let participant_count = game.participants.len();

    let Some(participant) = game.participant_for_user_mut(user_id) else {
        return Err(match status {
            GameStatus::InLobby => ServiceError::NotParticipant,
            _ => ServiceError::AlreadyStarted,
        });
    };

    let wants_start = status == GameStatus::InLobby && request.start_game;
    if wants_start {
        if !is_creator {
            return Err(ServiceError::OnlyCreatorMayStart);
        }
        if participant_count < config.min_to_start {
            return Err(ServiceError::NotEnoughParticipants {
                required: config.min_to_start,
                actual: participant_count,
            });
        }
    }

    participant.position = request.position;
    if status == GameStatus::InGame {
        participant.out_of_area = match (centre, radius) {
            (Some(centre), Some(radius)) => geo::is_outside(
                request.position,
                centre,
                radius,
                config.gps_tolerance_meters,
            ),
            _ => false,
        };
    }
    let participant_id = participant.id;
    let out_of_area = participant.out_of_area;

    if wants_start {
        return lifecycle::start_preparation(state, game).await;
    }

    persist(state, game).await?;
    debug!(
        game_id = %game.id,
        participant_id = %participant_id,
        status = ?status,
        out_of_area,
        "position updated"
    );
    Ok(())
}

/// Move the arena centre; hunter only, within the current radius.
pub async fn update_centre(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
    request: UpdateCentreRequest,
) -> Result<GameSnapshot, ServiceError> {
    request.validate()?;
    let mut guard = state.lock_game(game_id).await?;
    let mut game = load_locked(state, &mut guard, game_id).await?;

    if game.status != GameStatus::InGame {
        return Err(ServiceError::WrongPhase(
            "the arena can only move while the hunt is running".into(),
        ));
    }
    let caller = game
        .participant_for_user(user_id)
        .ok_or(ServiceError::NotParticipant)?;
    if !caller.is_hunter() {
        return Err(ServiceError::NotHunter);
    }

    let (Some(centre), Some(radius)) = (game.centre, game.radius_meters) else {
        return Err(ServiceError::WrongPhase("the arena is not set".into()));
    };
    if geo::is_outside(
        request.centre,
        centre,
        radius,
        state.config().gps_tolerance_meters,
    ) {
        return Err(ServiceError::CentreOutOfArea);
    }

    game.centre = Some(request.centre);
    persist(state, &mut game).await?;

    debug!(
        game_id = %game_id,
        latitude = request.centre.latitude,
        longitude = request.centre.longitude,
        "arena centre moved"
    );
    Ok(game.into())
}

/// Mark a hider as found, either by the hunter or by the hider themself.
///
/// Shrinks the arena, and finishes the game once no hider is left.
pub async fn admit_caught(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
    participant_id: ParticipantId,
) -> Result<GameSnapshot, ServiceError> {
    let mut guard = state.lock_game(game_id).await?;
    let mut game = load_locked(state, &mut guard, game_id).await?;

    if game.status != GameStatus::InGame {
        return Err(ServiceError::WrongPhase(
            "captures are only admitted while the hunt is running".into(),
        ));
    }
    let target = game
        .participants
        .get(&participant_id)
        .ok_or_else(|| participant_not_found(participant_id))?;
    if !target.is_hider() {
        return Err(ServiceError::InvalidInput(format!(
            "participant `{participant_id}` is not a hider"
        )));
    }
    let caller = game
        .participant_for_user(user_id)
        .ok_or(ServiceError::NotParticipant)?;
    if caller.id != participant_id && !caller.is_hunter() {
        return Err(ServiceError::NotHunter);
    }
    if target.state == ParticipantState::Found {
        return Err(ServiceError::AlreadyFound);
    }

    let now = state.now();
    if let Some(target) = game.participants.get_mut(&participant_id) {
        target.state = ParticipantState::Found;
        target.found_at = Some(now);
    }
    let shrink = state.config().radius_shrink_on_capture;
    game.radius_meters = game.radius_meters.map(|radius| (radius - shrink).max(0.0));

    info!(
        game_id = %game_id,
        participant_id = %participant_id,
        radius_meters = ?game.radius_meters,
        "hider found"
    );

    if game.all_hiders_found() {
        lifecycle::finish_game(state, &mut game, FinishReason::AllHidersFound).await?;
        guard.retire();
    } else {
        persist(state, &mut game).await?;
    }

    Ok(game.into())
}

/// Leave a lobby game. The creator leaving, or the last participant leaving, deletes the game.
pub async fn leave_game(
    state: &SharedState,
    user_id: UserId,
    game_id: GameId,
    participant_id: ParticipantId,
) -> Result<(), ServiceError> {
    let mut guard = state.lock_game(game_id).await?;
    let mut game = load_locked(state, &mut guard, game_id).await?;

    if game.status != GameStatus::InLobby {
        return Err(ServiceError::AlreadyStarted);
    }
    let Some(participant) = game.participants.get(&participant_id) else {
        let elsewhere = state
            .participants()
            .find_participant(participant_id)
            .await?
            .is_some();
        return Err(if elsewhere {
            ServiceError::NotParticipant
        } else {
            participant_not_found(participant_id)
        });
    };
    if participant.user_id != Some(user_id) {
        return Err(ServiceError::NotParticipant);
    }

    let leaves_empty = game.participants.len() == 1;
    if participant_id == game.creator_participant_id || leaves_empty {
        let Transition::Deleted = compute_transition(game.status, GameEvent::Abandon)? else {
            return Err(ServiceError::WrongPhase("game cannot be abandoned".into()));
        };
        state.games().delete_game(game_id).await?;
        state.timers().cancel(game_id);
        guard.retire();
        info!(
            game_id = %game_id,
            user_id = %user_id,
            "game deleted after its creator or last player left"
        );
        return Ok(());
    }

    game.participants.shift_remove(&participant_id);
    persist(state, &mut game).await?;
    info!(
        game_id = %game_id,
        participant_id = %participant_id,
        participants = game.participants.len(),
        "player left game"
    );
    Ok(())
}

/// Stamp and save the aggregate as the successor of the loaded version.
pub(crate) async fn persist(state: &SharedState, game: &mut Game) -> Result<(), ServiceError> {
    game.version += 1;
    game.updated_at = state.now();
    state.games().save_game(game.clone().into()).await?;
    Ok(())
}

pub(crate) async fn load_game(
    state: &SharedState,
    game_id: GameId,
) -> Result<Option<Game>, ServiceError> {
    Ok(state.games().find_game(game_id).await?.map(Game::from))
}

/// Load under the lock, retiring the lock entry of missing or finished games.
pub(crate) async fn load_locked(
    state: &SharedState,
    guard: &mut GameGuard,
    game_id: GameId,
) -> Result<Game, ServiceError> {
    let Some(game) = load_game(state, game_id).await? else {
        guard.retire();
        return Err(game_not_found(game_id));
    };
    if game.status.is_terminal() {
        guard.retire();
    }
    Ok(game)
}

async fn load_user(state: &SharedState, user_id: UserId) -> Result<UserEntity, ServiceError> {
    state
        .users()
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}` not found")))
}

fn game_not_found(game_id: GameId) -> ServiceError {
    ServiceError::NotFound(format!("game `{game_id}` not found"))
}

fn participant_not_found(participant_id: ParticipantId) -> ServiceError {
    ServiceError::NotFound(format!("participant `{participant_id}` not found"))
}
