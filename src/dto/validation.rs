//! Validation helpers for DTOs.

use std::time::SystemTime;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use validator::ValidationError;

/// Maximum number of characters accepted for a team name.
pub const TEAM_NAME_MAX_LEN: usize = 64;

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("value must contain non-whitespace characters".into());
        return Err(err);
    }
    Ok(())
}

/// Team names are trimmed, non-empty and at most [`TEAM_NAME_MAX_LEN`] characters.
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    validate_not_blank(name)?;
    let len = name.trim().chars().count();
    if len > TEAM_NAME_MAX_LEN {
        let mut err = ValidationError::new("team_name_length");
        err.message = Some(
            format!("team name must be at most {TEAM_NAME_MAX_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Accepts RFC 3339 timestamps.
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    parse_rfc3339(value).map(|_| ()).ok_or_else(|| {
        let mut err = ValidationError::new("rfc3339");
        err.message = Some(format!("`{value}` is not an RFC 3339 timestamp").into());
        err
    })
}

/// Parse an RFC 3339 timestamp into a [`SystemTime`].
pub fn parse_rfc3339(value: &str) -> Option<SystemTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(SystemTime::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_rejected() {
        assert!(validate_not_blank("quest").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn team_names_are_bounded() {
        assert!(validate_team_name("Night Owls").is_ok());
        assert!(validate_team_name(&"x".repeat(TEAM_NAME_MAX_LEN)).is_ok());
        assert!(validate_team_name(&"x".repeat(TEAM_NAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn rfc3339_timestamps_parse() {
        assert!(validate_rfc3339("2026-05-01T10:00:00Z").is_ok());
        assert!(validate_rfc3339("2026-05-01 10:00").is_err());
        let parsed = parse_rfc3339("1970-01-01T00:00:10Z").unwrap();
        assert_eq!(
            parsed.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
            10
        );
    }
}
