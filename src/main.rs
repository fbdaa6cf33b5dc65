//! Manhunt Back binary entrypoint wiring configuration, stores, timers and the dispatcher.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manhunt_back::{
    config::GameConfig,
    dao::{game_store::memory::MemoryGameStore, user_store::MemoryUserStore},
    services::timer_dispatch,
    state::{AppState, Stores, clock::TokioClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GameConfig::load();
    let stores = Stores::in_memory(MemoryGameStore::new(), MemoryUserStore::new());
    let (app_state, timer_events) = AppState::new(config, stores, Arc::new(TokioClock::new()));

    let dispatcher = timer_dispatch::spawn(app_state.clone(), timer_events);
    info!(
        max_participants = app_state.config().max_participants,
        min_to_start = app_state.config().min_to_start,
        "session coordinator ready"
    );

    shutdown_signal().await.context("waiting for shutdown signal")?;

    let cancelled = app_state.timers().cancel_all();
    dispatcher.abort();
    info!(cancelled_timers = cancelled, "session coordinator stopped");

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                return tokio::signal::ctrl_c().await;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = term.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
