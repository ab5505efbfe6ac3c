//! Signup form validation.
//!
//! Runs before a signup reaches the provider. The session manager itself
//! passes credentials through unvalidated.

use thiserror::Error;

/// Signup form rejected before any provider call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Password shorter than the configured minimum.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length, in characters.
        min: usize,
    },
}

/// Check a signup password against its confirmation and a minimum length.
///
/// Mismatch is reported before length.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first failed rule.
///
/// # Examples
///
/// ```
/// # use safeguard_session::validation::{validate_signup, ValidationError};
/// assert!(validate_signup("secret1", "secret1", 6).is_ok());
/// assert_eq!(
///     validate_signup("abc", "abc", 6),
///     Err(ValidationError::PasswordTooShort { min: 6 }),
/// );
/// ```
pub fn validate_signup(
    password: &str,
    confirmation: &str,
    min_len: usize,
) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < min_len {
        return Err(ValidationError::PasswordTooShort { min: min_len });
    }
    Ok(())
}
