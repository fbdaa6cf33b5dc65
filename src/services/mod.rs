/// Session coordinator commands and queries.
pub mod game_service;
/// Start, timer-driven and finishing transitions.
pub mod lifecycle;
/// Final ranking of a finished game.
pub mod ranking;
/// Hunter/hider assignment.
pub mod roles;
/// Cumulative user stats.
pub mod stats_service;
/// Timer expiry dispatcher.
pub mod timer_dispatch;
