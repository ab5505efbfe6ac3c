//! Session reducer.
//!
//! Pure business logic for the session lifecycle.
//!
//! # Flow
//!
//! ```text
//! 1. Operation (Login, Signup, ...) → clear last error → provider call effect
//! 2. Provider emits identity change → IdentityChanged → issue lookup ticket
//! 3. ProfileLoaded(ticket) → applied only if the ticket is still in flight
//! 4. OperationCompleted → record the failure, or refresh a freshly written profile
//! ```

use crate::actions::{Credentials, OperationOutcome, RequestId, SessionAction};
use crate::environment::SessionEnvironment;
use crate::error::{SessionError, StoreError};
use crate::identity::{Identity, IdentityId};
use crate::profile::{Profile, ProfileSeed};
use crate::providers::{AuthProvider, ProfileStore};
use crate::state::{LookupTicket, Session, SessionPhase};
use safeguard_core::effect::Effect;
use safeguard_core::environment::Clock;
use safeguard_core::reducer::Reducer;
use safeguard_core::{SmallVec, smallvec};
use std::marker::PhantomData;
use std::sync::Arc;

/// Session reducer.
///
/// Generic over the provider types so it can name its environment.
pub struct SessionReducer<P, S> {
    _phantom: PhantomData<fn() -> (P, S)>,
}

impl<P, S> SessionReducer<P, S> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<P, S> Default for SessionReducer<P, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S> Clone for SessionReducer<P, S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<P, S> std::fmt::Debug for SessionReducer<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionReducer")
    }
}

impl<P, S> SessionReducer<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    fn begin_operation(state: &mut Session) {
        state.last_error = None;
        state.timed_out = None;
    }

    /// Start a profile lookup for `identity_id`, superseding any in flight.
    fn begin_lookup(
        state: &mut Session,
        env: &SessionEnvironment<P, S>,
        identity_id: IdentityId,
    ) -> Effect<SessionAction> {
        let ticket = state.reconciliation.issue(identity_id);
        tracing::debug!(
            identity_id = %ticket.identity_id,
            seq = ticket.seq,
            "Starting profile lookup"
        );

        let profiles = env.profiles.clone();
        Effect::future(async move {
            let result = profiles.get_profile(&ticket.identity_id).await;
            Some(SessionAction::ProfileLoaded { ticket, result })
        })
    }

    fn on_identity_changed(
        state: &mut Session,
        env: &SessionEnvironment<P, S>,
        identity: Option<Identity>,
    ) -> SmallVec<[Effect<SessionAction>; 4]> {
        let Some(identity) = identity else {
            if let Some(stale) = state.reconciliation.in_flight.take() {
                tracing::debug!(
                    identity_id = %stale.identity_id,
                    "Signed out with lookup in flight, result will be discarded"
                );
            }
            tracing::debug!("Identity cleared");
            state.phase = SessionPhase::SignedOut;
            state.is_loading = false;
            return smallvec![Effect::None];
        };

        let lookup_outstanding = state
            .reconciliation
            .in_flight
            .as_ref()
            .is_some_and(|ticket| ticket.identity_id == identity.id);

        let identity_id = identity.id.clone();
        state.phase = SessionPhase::SignedInProfilePending { identity };

        if lookup_outstanding {
            tracing::debug!(%identity_id, "Lookup already outstanding for identity");
            return smallvec![Effect::None];
        }

        smallvec![Self::begin_lookup(state, env, identity_id)]
    }

    fn on_profile_loaded(
        state: &mut Session,
        ticket: &LookupTicket,
        result: Result<Option<Profile>, StoreError>,
    ) {
        if state.reconciliation.in_flight.as_ref() != Some(ticket) {
            tracing::debug!(
                identity_id = %ticket.identity_id,
                seq = ticket.seq,
                "Discarding superseded profile lookup"
            );
            metrics::counter!("session.reconciliation.discarded").increment(1);
            return;
        }
        state.reconciliation.in_flight = None;
        state.is_loading = false;

        let Some(identity) = state
            .phase
            .identity()
            .filter(|identity| identity.id == ticket.identity_id)
            .cloned()
        else {
            return;
        };

        match result {
            Ok(profile) => {
                tracing::debug!(
                    identity_id = %identity.id,
                    found = profile.is_some(),
                    "Profile reconciled"
                );
                state.phase = SessionPhase::SignedIn { identity, profile };
            },
            Err(error) => {
                // No caller to report to; the pending phase is the visible signal
                tracing::warn!(identity_id = %identity.id, %error, "Profile lookup failed");
                metrics::counter!("session.reconciliation.failed").increment(1);
            },
        }
    }

    fn on_operation_completed(
        state: &mut Session,
        env: &SessionEnvironment<P, S>,
        request_id: RequestId,
        result: Result<OperationOutcome, SessionError>,
    ) -> SmallVec<[Effect<SessionAction>; 4]> {
        let abandoned = state.timed_out == Some(request_id);
        if abandoned {
            state.timed_out = None;
        }

        match result {
            Err(error) => {
                match &error {
                    SessionError::Auth(auth) if auth.is_cancelled() => {
                        tracing::debug!(%request_id, "Operation cancelled by user");
                    },
                    _ => tracing::warn!(%request_id, %error, "Operation failed"),
                }
                metrics::counter!("session.operation.failed").increment(1);
                state.last_error = Some(error);
                smallvec![Effect::None]
            },
            Ok(outcome) => {
                if abandoned {
                    tracing::debug!(%request_id, "Operation succeeded after its caller timed out");
                    state.last_error = None;
                }
                Self::refresh_after_write(state, env, outcome)
            },
        }
    }

    /// Re-run reconciliation when a profile write may have raced the
    /// notification's lookup.
    fn refresh_after_write(
        state: &mut Session,
        env: &SessionEnvironment<P, S>,
        outcome: OperationOutcome,
    ) -> SmallVec<[Effect<SessionAction>; 4]> {
        match outcome {
            OperationOutcome::SignedIn {
                identity,
                profile_created: true,
            } => {
                // The notification's lookup may have run before the write landed
                let needs_refresh = state.identity().is_some_and(|current| current.id == identity.id)
                    && state.profile().is_none();
                if needs_refresh {
                    smallvec![Self::begin_lookup(state, env, identity.id)]
                } else {
                    smallvec![Effect::None]
                }
            },
            OperationOutcome::SignedIn { .. } | OperationOutcome::SignedOut => {
                smallvec![Effect::None]
            },
        }
    }
}

impl<P, S> Reducer for SessionReducer<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    type State = Session;
    type Action = SessionAction;
    type Environment = SessionEnvironment<P, S>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════════
            // Operations
            // ═══════════════════════════════════════════════════════════════════
            SessionAction::Login {
                request_id,
                credentials,
            } => {
                Self::begin_operation(state);
                let auth = env.auth.clone();
                smallvec![Effect::future(async move {
                    let result = login(auth, credentials).await;
                    Some(SessionAction::OperationCompleted { request_id, result })
                })]
            },

            SessionAction::Signup {
                request_id,
                credentials,
                seed,
            } => {
                Self::begin_operation(state);
                let auth = env.auth.clone();
                let profiles = env.profiles.clone();
                let clock = Arc::clone(&env.clock);
                smallvec![Effect::future(async move {
                    let result = signup(auth, profiles, clock, credentials, seed).await;
                    Some(SessionAction::OperationCompleted { request_id, result })
                })]
            },

            SessionAction::LoginWithFederatedProvider { request_id } => {
                Self::begin_operation(state);
                let auth = env.auth.clone();
                let profiles = env.profiles.clone();
                let clock = Arc::clone(&env.clock);
                smallvec![Effect::future(async move {
                    let result = federated_login(auth, profiles, clock).await;
                    Some(SessionAction::OperationCompleted { request_id, result })
                })]
            },

            SessionAction::Logout { request_id } => {
                Self::begin_operation(state);
                let auth = env.auth.clone();
                smallvec![Effect::future(async move {
                    let result = auth
                        .sign_out()
                        .await
                        .map(|()| OperationOutcome::SignedOut)
                        .map_err(SessionError::from);
                    Some(SessionAction::OperationCompleted { request_id, result })
                })]
            },

            // ═══════════════════════════════════════════════════════════════════
            // Notifications
            // ═══════════════════════════════════════════════════════════════════
            SessionAction::IdentityChanged { identity } => {
                Self::on_identity_changed(state, env, identity)
            },

            // ═══════════════════════════════════════════════════════════════════
            // Results
            // ═══════════════════════════════════════════════════════════════════
            SessionAction::ProfileLoaded { ticket, result } => {
                Self::on_profile_loaded(state, &ticket, result);
                smallvec![Effect::None]
            },

            SessionAction::OperationCompleted { request_id, result } => {
                Self::on_operation_completed(state, env, request_id, result)
            },

            SessionAction::OperationTimedOut { request_id } => {
                tracing::warn!(%request_id, "Caller stopped waiting for operation");
                state.last_error = Some(SessionError::Timeout);
                state.timed_out = Some(request_id);
                smallvec![Effect::None]
            },
        }
    }
}

/// Password sign-in. The profile is left to the notification path.
async fn login<P: AuthProvider>(
    auth: P,
    credentials: Credentials,
) -> Result<OperationOutcome, SessionError> {
    let identity = auth
        .sign_in_with_password(&credentials.email, credentials.password())
        .await?;

    Ok(OperationOutcome::SignedIn {
        identity,
        profile_created: false,
    })
}

/// Account creation followed by an unconditional profile write.
///
/// A failed write is reported but the account is not rolled back.
async fn signup<P: AuthProvider, S: ProfileStore>(
    auth: P,
    profiles: S,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
    seed: ProfileSeed,
) -> Result<OperationOutcome, SessionError> {
    let identity = auth
        .create_account_with_password(&credentials.email, credentials.password())
        .await?;

    let profile = Profile::for_signup(credentials.email, seed, clock.now());
    profiles.set_profile(&identity.id, &profile).await?;

    Ok(OperationOutcome::SignedIn {
        identity,
        profile_created: true,
    })
}

/// Federated sign-in; writes the profile only if none exists yet.
async fn federated_login<P: AuthProvider, S: ProfileStore>(
    auth: P,
    profiles: S,
    clock: Arc<dyn Clock>,
) -> Result<OperationOutcome, SessionError> {
    let identity = auth.sign_in_with_federated_provider().await?;

    let profile_created = match profiles.get_profile(&identity.id).await? {
        Some(_) => false,
        None => {
            let profile = Profile::for_federated(&identity, clock.now());
            profiles.set_profile(&identity.id, &profile).await?;
            true
        },
    };

    Ok(OperationOutcome::SignedIn {
        identity,
        profile_created,
    })
}
