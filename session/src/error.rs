//! Error types for session operations.
//!
//! Every error is `Clone + PartialEq` so the most recent failure can live in
//! the published [`Session`](crate::Session) snapshot.

use safeguard_runtime::RuntimeError;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures reported by the auth provider.
///
/// Messages are provider-agnostic; vendor prefixes and error codes are
/// translated by [`AuthError::from_provider_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong email or password, or unknown account.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Signup for an email that already has an account.
    #[error("An account already exists for this email")]
    EmailAlreadyInUse,

    /// Password rejected by the provider's strength rules.
    #[error("Password is too weak")]
    WeakPassword,

    /// The user closed or abandoned the federated sign-in flow.
    #[error("Sign-in was cancelled")]
    Cancelled,

    /// The provider is throttling this client.
    #[error("Too many attempts, please try again later")]
    TooManyRequests,

    /// The provider could not be reached. Carries a provider-agnostic detail.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other provider failure.
    #[error("{message}")]
    Provider {
        /// Provider error code, when one was present.
        code: Option<String>,
        /// Message with the vendor prefix removed.
        message: String,
    },
}

impl AuthError {
    /// Translate a raw provider message into a tagged error.
    ///
    /// Strips `prefix` (e.g. `"Firebase: "`), then maps a trailing
    /// `(auth/<code>)` tag to a variant when the code is known.
    ///
    /// # Examples
    ///
    /// ```
    /// # use safeguard_session::AuthError;
    /// let error = AuthError::from_provider_message(
    ///     "Firebase: Error (auth/email-already-in-use).",
    ///     "Firebase: ",
    /// );
    /// assert_eq!(error, AuthError::EmailAlreadyInUse);
    ///
    /// let error = AuthError::from_provider_message("Firebase: Quota exceeded.", "Firebase: ");
    /// assert_eq!(error.to_string(), "Quota exceeded.");
    /// ```
    #[must_use]
    pub fn from_provider_message(raw: &str, prefix: &str) -> Self {
        let message = raw.strip_prefix(prefix).unwrap_or(raw).trim();
        let code = provider_code(message);

        match code {
            Some("wrong-password" | "user-not-found" | "invalid-credential" | "invalid-email") => {
                Self::InvalidCredentials
            },
            Some("email-already-in-use") => Self::EmailAlreadyInUse,
            Some("weak-password") => Self::WeakPassword,
            Some("popup-closed-by-user" | "cancelled-popup-request") => Self::Cancelled,
            Some("too-many-requests") => Self::TooManyRequests,
            Some(code @ "network-request-failed") => Self::Network(code.replace('-', " ")),
            _ => Self::Provider {
                code: code.map(str::to_string),
                message: message.to_string(),
            },
        }
    }

    /// Returns `true` if the user backed out of the flow.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Extract `code` from a message containing `(auth/code)`.
fn provider_code(message: &str) -> Option<&str> {
    let start = message.rfind("(auth/")? + "(auth/".len();
    let len = message[start..].find(')')?;
    let code = &message[start..start + len];
    (!code.is_empty()).then_some(code)
}

/// Failures reported by the profile document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading a profile document failed.
    #[error("Could not read profile: {0}")]
    Read(String),

    /// Writing a profile document failed.
    #[error("Could not save profile: {0}")]
    Write(String),

    /// The store is unreachable.
    #[error("Profile store unavailable")]
    Unavailable,
}

/// Error returned by session operations and recorded as the session's last error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The auth provider rejected the operation.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The profile store failed; the account itself may already exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation did not complete within the configured timeout.
    #[error("The request timed out")]
    Timeout,

    /// The session manager is shutting down.
    #[error("Session is shutting down")]
    ShuttingDown,

    /// An operation completed with an outcome that does not fit the request.
    #[error("Operation finished in an unexpected state")]
    UnexpectedOutcome,
}

impl SessionError {
    /// The text the presentation layer shows verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<RuntimeError> for SessionError {
    fn from(error: RuntimeError) -> Self {
        match error {
            RuntimeError::Timeout => Self::Timeout,
            RuntimeError::ShutdownInProgress
            | RuntimeError::ShutdownTimeout(_)
            | RuntimeError::ChannelClosed => Self::ShuttingDown,
        }
    }
}
