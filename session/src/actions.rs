//! Session actions.
//!
//! Actions are the only way to change the session. They come in three kinds:
//!
//! - **Operations**: caller requests (`Login`, `Signup`, ...), each tagged
//!   with a [`RequestId`] so the caller can pick out its own completion
//! - **Notifications**: `IdentityChanged`, forwarded from the auth provider
//! - **Results**: produced by effects (`OperationCompleted`, `ProfileLoaded`)

use crate::error::{SessionError, StoreError};
use crate::identity::Identity;
use crate::profile::{Profile, ProfileSeed};
use crate::state::LookupTicket;
use std::fmt;

/// Correlation id for one operation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    /// Generate a new random `RequestId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email and password pair.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    password: String,
}

impl Credentials {
    /// Bundle an email and password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// The password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a successful operation left behind.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// The provider returned an identity.
    SignedIn {
        /// Identity returned by the provider.
        identity: Identity,
        /// Whether this operation wrote the identity's profile document.
        profile_created: bool,
    },

    /// The provider signed the user out.
    SignedOut,
}

impl OperationOutcome {
    /// The identity, for sign-in outcomes.
    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::SignedIn { identity, .. } => Some(identity),
            Self::SignedOut => None,
        }
    }
}

/// Session action.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════════════════
    /// Sign in with email and password.
    Login {
        /// Correlation id.
        request_id: RequestId,
        /// Credentials, passed to the provider unvalidated.
        credentials: Credentials,
    },

    /// Create a password account and its profile document.
    Signup {
        /// Correlation id.
        request_id: RequestId,
        /// Credentials for the new account.
        credentials: Credentials,
        /// Extra profile fields.
        seed: ProfileSeed,
    },

    /// Run the federated sign-in flow, creating the profile on first sign-in.
    LoginWithFederatedProvider {
        /// Correlation id.
        request_id: RequestId,
    },

    /// Sign out.
    Logout {
        /// Correlation id.
        request_id: RequestId,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Notifications
    // ═══════════════════════════════════════════════════════════════════════
    /// The provider reported the current identity (or none).
    IdentityChanged {
        /// New identity, `None` when signed out.
        identity: Option<Identity>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Results
    // ═══════════════════════════════════════════════════════════════════════
    /// An operation finished.
    OperationCompleted {
        /// Correlation id of the operation.
        request_id: RequestId,
        /// Outcome or failure.
        result: Result<OperationOutcome, SessionError>,
    },

    /// The caller stopped waiting for an operation.
    OperationTimedOut {
        /// Correlation id of the operation.
        request_id: RequestId,
    },

    /// A profile lookup finished.
    ProfileLoaded {
        /// Ticket issued when the lookup started.
        ticket: LookupTicket,
        /// The document, `None` if the store has none.
        result: Result<Option<Profile>, StoreError>,
    },
}

impl SessionAction {
    /// Returns `true` if this is the completion of `request_id`.
    #[must_use]
    pub fn completes(&self, request_id: RequestId) -> bool {
        matches!(self, Self::OperationCompleted { request_id: id, .. } if *id == request_id)
    }
}
