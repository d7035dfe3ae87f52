//! Validation helpers for DTOs.

use std::time::SystemTime;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use validator::ValidationError;

/// Longest accepted player name, in characters, after trimming.
pub const MAX_PLAYER_NAME_LENGTH: usize = 64;

/// Largest absolute value accepted for a raw score or a points difference.
pub const MAX_ENTRY_MAGNITUDE: i64 = 1_000_000_000;

/// Validates that a score figure stays within [`MAX_ENTRY_MAGNITUDE`].
pub fn validate_entry_magnitude(value: &i64) -> Result<(), ValidationError> {
    if value.unsigned_abs() > MAX_ENTRY_MAGNITUDE.unsigned_abs() {
        let mut err = ValidationError::new("entry_magnitude");
        err.message = Some(
            format!("Value must be between -{MAX_ENTRY_MAGNITUDE} and {MAX_ENTRY_MAGNITUDE}").into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates that a player name has visible content and a sane length.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Ton")        // Ok
/// validate_player_name("   ")        // Err - blank
/// validate_player_name(&"x".repeat(65)) // Err - too long
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_PLAYER_NAME_LENGTH {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_LENGTH} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a timestamp is RFC 3339, e.g. `2024-03-09T19:30:00+09:00`.
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    parse_rfc3339(value).map(|_| ()).ok_or_else(|| {
        let mut err = ValidationError::new("timestamp_format");
        err.message = Some("Timestamp must be RFC 3339".into());
        err
    })
}

/// Parse an RFC 3339 timestamp.
pub fn parse_rfc3339(value: &str) -> Option<SystemTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(SystemTime::from)
}
