//! Validation helpers for DTOs.

use validator::{Validate, ValidationError, ValidationErrors};

use crate::geo::GeoPoint;

/// Longest accepted game name, in characters.
pub const MAX_GAME_NAME_LENGTH: usize = 64;

/// Validates that a game name is non-blank and at most [`MAX_GAME_NAME_LENGTH`] characters.
pub fn validate_game_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("game_name_blank");
        err.message = Some("Game name must not be blank".into());
        return Err(err);
    }

    let length = name.chars().count();
    if length > MAX_GAME_NAME_LENGTH {
        let mut err = ValidationError::new("game_name_length");
        err.message = Some(
            format!("Game name must be at most {MAX_GAME_NAME_LENGTH} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

fn validate_degrees(value: f64, limit: f64, code: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && (-limit..=limit).contains(&value) {
        return Ok(());
    }
    let mut err = ValidationError::new(code);
    err.message = Some(format!("Must be a finite value within ±{limit} degrees").into());
    Err(err)
}

impl Validate for GeoPoint {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_degrees(self.latitude, 90.0, "latitude_range") {
            errors.add("latitude", e);
        }
        if let Err(e) = validate_degrees(self.longitude, 180.0, "longitude_range") {
            errors.add("longitude", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
