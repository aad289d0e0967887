//! Username standardization and format validation
//!
//! Usernames are standardized (trimmed, lowercased) before any uniqueness
//! check or membership-key use; the raw form survives only in system
//! message text.

use crate::error::JoinError;

/// Characters accepted as the required special character
pub const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:'\",.<>/?";

/// Minimum length of a standardized username
const MIN_LENGTH: usize = 5;

/// Minimum number of decimal digits in a username
const MIN_DIGITS: usize = 2;

/// Standardize a raw username: trim surrounding whitespace and case-fold
pub fn standardize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validate a standardized username against the format rules
///
/// The three conditions are checked in fixed order and the first failing
/// condition's message is returned:
/// 1. at least 5 characters
/// 2. at least 2 decimal digits
/// 3. at least 1 special character from [`SPECIAL_CHARS`]
pub fn validate(username: &str) -> Result<(), JoinError> {
    if username.chars().count() < MIN_LENGTH {
        return Err(JoinError::InvalidUsername(
            "Username must be at least 5 characters long.".to_string(),
        ));
    }

    if username.chars().filter(|c| c.is_ascii_digit()).count() < MIN_DIGITS {
        return Err(JoinError::InvalidUsername(
            "Username must contain at least 2 numbers.".to_string(),
        ));
    }

    if !username.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(JoinError::InvalidUsername(
            "Username must contain at least 1 special character.".to_string(),
        ));
    }

    Ok(())
}
