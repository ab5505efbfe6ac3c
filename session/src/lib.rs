//! # Safeguard Session
//!
//! Authentication session and profile synchronisation for the Safeguard app.
//!
//! The session manager owns the signed-in identity lifecycle:
//!
//! - listens to identity-change notifications from an [`AuthProvider`]
//! - reconciles the matching [`Profile`] document in a [`ProfileStore`]
//! - publishes a read-only [`Session`] snapshot after every transition
//! - exposes `login`, `signup`, `login_with_federated_provider` and `logout`
//!
//! ## Architecture
//!
//! The session is implemented as a reducer and effects:
//!
//! ```text
//! Action → Reducer → (Session, Effects) → Effect Execution → More Actions
//! ```
//!
//! Operations never write the identity themselves. The provider's
//! notification is the only thing that moves the session between signed-in
//! and signed-out, and profile reconciliation is the only thing that fills in
//! the profile.
//!
//! ## Example
//!
//! ```rust,ignore
//! use safeguard_session::*;
//!
//! let env = SessionEnvironment::new(auth_provider, profile_store, Arc::new(SystemClock));
//! let manager = SessionManager::start(env, SessionConfig::from_env());
//!
//! manager.login("a@x.com", "secret").await?;
//! let session = manager
//!     .wait_until(|s| s.phase().is_signed_in(), Duration::from_secs(5))
//!     .await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod environment;
pub mod error;
pub mod identity;
pub mod manager;
pub mod profile;
pub mod providers;
pub mod reducer;
pub mod state;
pub mod validation;

// Mock providers for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::{Credentials, OperationOutcome, RequestId, SessionAction};
pub use config::SessionConfig;
pub use environment::SessionEnvironment;
pub use error::{AuthError, SessionError, StoreError};
pub use identity::{Identity, IdentityId};
pub use manager::SessionManager;
pub use profile::{AccountProvider, Profile, ProfileSeed};
pub use providers::{AuthProvider, IdentitySubscription, ProfileStore};
pub use reducer::SessionReducer;
pub use state::{LookupTicket, Session, SessionPhase};
