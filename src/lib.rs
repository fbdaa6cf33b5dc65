//! Library crate for manhunt-back, exposing the session coordinator for the binary and
//! integration tests.

pub mod config;
/// Storage entities and store traits.
pub mod dao;
/// Request payloads and response snapshots.
pub mod dto;
/// Service error taxonomy.
pub mod error;
pub mod geo;
/// Coordinator commands and game lifecycle.
pub mod services;
/// Shared state, clock, timers and per-game locks.
pub mod state;
