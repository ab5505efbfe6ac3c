//! Session environment.
//!
//! This module defines the environment type for dependency injection
//! in the session reducer.

use crate::providers::{AuthProvider, ProfileStore};
use safeguard_core::environment::Clock;
use std::sync::Arc;

/// Session environment.
///
/// Contains all external dependencies needed by the session reducer.
///
/// # Type Parameters
///
/// - `P`: Auth provider
/// - `S`: Profile store
#[derive(Clone)]
pub struct SessionEnvironment<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    /// Identity service.
    pub auth: P,

    /// Profile document store.
    pub profiles: S,

    /// Clock for `created_at` timestamps.
    pub clock: Arc<dyn Clock>,
}

impl<P, S> SessionEnvironment<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    /// Create a new session environment.
    #[must_use]
    pub fn new(auth: P, profiles: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth,
            profiles,
            clock,
        }
    }
}
