use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use crate::{
    error::ServiceError,
    services::lifecycle,
    state::{
        SharedState,
        timers::{TimerEvents, TimerExpired},
    },
};

/// Spawn the task feeding timer expiries into the coordinator.
///
/// Every expiry runs in its own task; errors and panics are logged and never stop the
/// dispatcher. A panicked expiry is re-armed like a transient failure.
pub fn spawn(state: SharedState, mut events: TimerEvents) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(expired) = events.recv().await {
            let state = state.clone();
            tokio::spawn(async move {
                let handler_state = state.clone();
                let handler = tokio::spawn(async move {
                    lifecycle::handle_timer_expired(&handler_state, expired).await
                });
                let outcome = handler.await;
                if matches!(&outcome, Err(join_err) if join_err.is_panic()) {
                    lifecycle::retry_expiry(&state, expired);
                }
                report(expired, outcome);
            });
        }
        debug!("timer channel closed; dispatcher stopped");
    })
}

fn report(expired: TimerExpired, outcome: Result<Result<(), ServiceError>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(
            game_id = %expired.game_id,
            phase = ?expired.phase,
            timer_id = %expired.timer_id,
            error = %err,
            "timer expiry failed"
        ),
        Err(join_err) if join_err.is_panic() => error!(
            game_id = %expired.game_id,
            phase = ?expired.phase,
            timer_id = %expired.timer_id,
            "timer expiry handler panicked"
        ),
        Err(join_err) => debug!(
            game_id = %expired.game_id,
            error = %join_err,
            "timer expiry handler cancelled"
        ),
    }
}
