//! Status transitions that outlive a single command: starting, timer expiries, finishing.

use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::{
        game_service::{load_game, persist},
        ranking::assign_ranks,
        roles::assign_roles,
        stats_service::{GameResult, record_results},
    },
    state::{
        SharedState,
        game::Game,
        state_machine::{FinishReason, GameEvent, GameStatus, next_status},
        timers::{TimerExpired, TimerPhase},
    },
};

/// Delay before an expiry that failed is delivered again.
pub const EXPIRY_RETRY_SECONDS: u32 = 5;

/// Leave the lobby: assign roles, open the preparation phase and arm its timer.
///
/// The caller holds the game lock.
pub(crate) async fn start_preparation(
    state: &SharedState,
    game: &mut Game,
) -> Result<(), ServiceError> {
    game.status = next_status(game.status, GameEvent::StartPreparation)?;
    let hunter_id = assign_roles(game, state.config().arena_radius_per_participant);
    game.phase_started_at = Some(state.now());
    persist(state, game).await?;

    state
        .timers()
        .arm_preparation(game.id, game.preparation_seconds);
    info!(
        game_id = %game.id,
        hunter_id = ?hunter_id,
        participants = game.participants.len(),
        preparation_seconds = game.preparation_seconds,
        "game preparation started"
    );
    Ok(())
}

/// Apply a timer expiry if the game is still in the phase the timer was armed for.
///
/// Stale expiries are ignored. A transient failure is scheduled again after
/// [`EXPIRY_RETRY_SECONDS`]; permanent failures are only reported.
pub async fn handle_timer_expired(
    state: &SharedState,
    expired: TimerExpired,
) -> Result<(), ServiceError> {
    let result = apply_timer_expired(state, expired).await;
    if let Err(err) = &result {
        if err.is_transient() {
            retry_expiry(state, expired);
        } else {
            debug!(
                game_id = %expired.game_id,
                phase = ?expired.phase,
                "permanent timer expiry failure; not retrying"
            );
        }
    }
    result
}

/// Re-arm the timer of a failed expiry unless another timer took the slot meanwhile.
pub(crate) fn retry_expiry(state: &SharedState, expired: TimerExpired) {
    if state.timers().armed(expired.game_id).is_some() {
        return;
    }
    state
        .timers()
        .arm(expired.game_id, expired.phase, EXPIRY_RETRY_SECONDS);
    warn!(
        game_id = %expired.game_id,
        phase = ?expired.phase,
        retry_seconds = EXPIRY_RETRY_SECONDS,
        "timer expiry failed; retrying"
    );
}

async fn apply_timer_expired(
    state: &SharedState,
    expired: TimerExpired,
) -> Result<(), ServiceError> {
    let TimerExpired {
        game_id,
        phase,
        timer_id,
    } = expired;
    let mut guard = state.lock_game(game_id).await?;

    let Some(mut game) = load_game(state, game_id).await? else {
        guard.retire();
        debug!(
            game_id = %game_id,
            phase = ?phase,
            timer_id = %timer_id,
            "timer expired for a deleted game"
        );
        return Ok(());
    };

    match (phase, game.status) {
        (TimerPhase::Preparation, GameStatus::InGamePreparation) => {
            game.status = next_status(game.status, GameEvent::PreparationElapsed)?;
            game.phase_started_at = Some(state.now());
            persist(state, &mut game).await?;

            state.timers().arm_finish(game_id, game.game_seconds);
            info!(
                game_id = %game_id,
                game_seconds = game.game_seconds,
                "preparation elapsed; hunt started"
            );
        }
        (TimerPhase::Finish, GameStatus::InGame) => {
            finish_game(state, &mut game, FinishReason::TimeElapsed).await?;
            guard.retire();
        }
        (phase, status) => {
            if status.is_terminal() {
                guard.retire();
            }
            debug!(
                game_id = %game_id,
                phase = ?phase,
                status = ?status,
                timer_id = %timer_id,
                "ignoring stale timer expiry"
            );
        }
    }

    Ok(())
}

/// Close the hunt: rank, detach users, persist, then record stats.
///
/// The caller holds the game lock. Stats failures are logged and do not fail the
/// transition; a failed save records no stats.
pub(crate) async fn finish_game(
    state: &SharedState,
    game: &mut Game,
    reason: FinishReason,
) -> Result<(), ServiceError> {
    game.status = next_status(game.status, GameEvent::Finish(reason))?;
    assign_ranks(game);

    let results: Vec<GameResult> = game
        .participants
        .values()
        .filter_map(|participant| {
            Some(GameResult {
                user_id: participant.user_id?,
                rank: participant.rank?,
            })
        })
        .collect();
    for participant in game.participants.values_mut() {
        participant.user_id = None;
    }

    persist(state, game).await?;
    state.timers().cancel(game.id);
    info!(game_id = %game.id, reason = ?reason, "game finished");

    let updated = record_results(state, game.id, &results).await;
    if updated < results.len() {
        warn!(
            game_id = %game.id,
            updated,
            expected = results.len(),
            "some user stats could not be updated"
        );
    }

    Ok(())
}
