//! Game rule configuration loading: ranges, caps and scoring knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MANHUNT_BACK_CONFIG_PATH";

/// Preparation time applied when a create request leaves it out.
pub const DEFAULT_PREPARATION_SECONDS: u32 = 30;
/// Game time applied when a create request leaves it out.
pub const DEFAULT_GAME_SECONDS: u32 = 300;

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[T; 2]")]
pub struct Bounds<T> {
    /// Lowest accepted value.
    pub min: T,
    /// Highest accepted value.
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    /// Build a new inclusive range.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the range, both ends included.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

impl<T> From<[T; 2]> for Bounds<T> {
    fn from([min, max]: [T; 2]) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Immutable rule set shared by every game handled by the coordinator.
pub struct GameConfig {
    /// Accepted preparation phase lengths, in seconds.
    pub preparation_seconds: Bounds<u32>,
    /// Accepted in-game phase lengths, in seconds.
    pub game_seconds: Bounds<u32>,
    /// Accepted arena radius at creation, in metres.
    pub radius_meters: Bounds<f64>,
    /// Hard cap on participants in one game.
    pub max_participants: usize,
    /// Minimum participants before the creator may start.
    pub min_to_start: usize,
    /// GPS tolerance subtracted from every distance.
    pub gps_tolerance_meters: f64,
    /// Arena shrink applied on every capture.
    pub radius_shrink_on_capture: f64,
    /// Arena radius granted per participant when roles are assigned.
    pub arena_radius_per_participant: f64,
    /// Points awarded to rank-1 participants.
    pub points_for_win: u64,
    /// Points awarded to every other participant.
    pub points_for_participation: u64,
}

impl GameConfig {
    /// Load the configuration from disk, falling back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded game configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "invalid game configuration; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document, filling missing keys with defaults.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw = serde_json::from_str::<RawConfig>(contents).map_err(ConfigError::Parse)?;
        let config = Self::from(raw);
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !self.preparation_seconds.is_ordered() {
            return Err(ConfigError::Inconsistent("preparationSecondsRange"));
        }
        if !self.game_seconds.is_ordered() {
            return Err(ConfigError::Inconsistent("gameSecondsRange"));
        }
        if !self.radius_meters.is_ordered() || self.radius_meters.min < 0.0 {
            return Err(ConfigError::Inconsistent("radiusRangeMeters"));
        }
        if self.min_to_start < 2 {
            return Err(ConfigError::Inconsistent("minToStart"));
        }
        if self.max_participants < self.min_to_start {
            return Err(ConfigError::Inconsistent("maxParticipantsPerGame"));
        }
        if self.gps_tolerance_meters < 0.0 {
            return Err(ConfigError::Inconsistent("gpsToleranceMeters"));
        }
        if self.radius_shrink_on_capture < 0.0 {
            return Err(ConfigError::Inconsistent("radiusShrinkOnCapture"));
        }
        if self.arena_radius_per_participant <= 0.0 {
            return Err(ConfigError::Inconsistent("arenaRadiusPerParticipant"));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            preparation_seconds: Bounds::new(10, 300),
            game_seconds: Bounds::new(60, 900),
            radius_meters: Bounds::new(5.0, 100.0),
            max_participants: 5,
            min_to_start: 2,
            gps_tolerance_meters: 5.0,
            radius_shrink_on_capture: 25.0,
            arena_radius_per_participant: 25.0,
            points_for_win: 10,
            points_for_participation: 5,
        }
    }
}

/// Reasons a configuration document is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for [`RawConfig`].
    #[error("failed to parse configuration")]
    Parse(#[source] serde_json::Error),
    /// A knob holds a value the coordinator cannot work with.
    #[error("inconsistent configuration value for `{0}`")]
    Inconsistent(&'static str),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    preparation_seconds_range: Option<Bounds<u32>>,
    game_seconds_range: Option<Bounds<u32>>,
    radius_range_meters: Option<Bounds<f64>>,
    max_participants_per_game: Option<usize>,
    min_to_start: Option<usize>,
    gps_tolerance_meters: Option<f64>,
    radius_shrink_on_capture: Option<f64>,
    arena_radius_per_participant: Option<f64>,
    points_for_win: Option<u64>,
    points_for_participation: Option<u64>,
}

impl From<RawConfig> for GameConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = GameConfig::default();
        Self {
            preparation_seconds: raw
                .preparation_seconds_range
                .unwrap_or(defaults.preparation_seconds),
            game_seconds: raw.game_seconds_range.unwrap_or(defaults.game_seconds),
            radius_meters: raw.radius_range_meters.unwrap_or(defaults.radius_meters),
            max_participants: raw
                .max_participants_per_game
                .unwrap_or(defaults.max_participants),
            min_to_start: raw.min_to_start.unwrap_or(defaults.min_to_start),
            gps_tolerance_meters: raw
                .gps_tolerance_meters
                .unwrap_or(defaults.gps_tolerance_meters),
            radius_shrink_on_capture: raw
                .radius_shrink_on_capture
                .unwrap_or(defaults.radius_shrink_on_capture),
            arena_radius_per_participant: raw
                .arena_radius_per_participant
                .unwrap_or(defaults.arena_radius_per_participant),
            points_for_win: raw.points_for_win.unwrap_or(defaults.points_for_win),
            points_for_participation: raw
                .points_for_participation
                .unwrap_or(defaults.points_for_participation),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
