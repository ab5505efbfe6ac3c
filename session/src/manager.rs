//! Session manager.
//!
//! The application-facing handle: owns the [`Store`] running the
//! [`SessionReducer`], forwards the auth provider's identity notifications
//! into it, and turns each operation into a request/response round trip.
//!
//! One manager is created per process with [`SessionManager::start`] and
//! passed (or cloned) to whoever needs the session. Clones share the store.

use crate::actions::{Credentials, OperationOutcome, RequestId, SessionAction};
use crate::config::SessionConfig;
use crate::environment::SessionEnvironment;
use crate::error::{Result, SessionError};
use crate::identity::Identity;
use crate::profile::ProfileSeed;
use crate::providers::{AuthProvider, IdentitySubscription, ProfileStore};
use crate::reducer::SessionReducer;
use crate::state::Session;
use safeguard_runtime::{RuntimeError, Store};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type SessionStore<P, S> =
    Store<Session, SessionAction, SessionEnvironment<P, S>, SessionReducer<P, S>>;

/// Owns the notification listener task. Dropping the last manager clone
/// aborts it, which drops the subscription and unsubscribes.
#[derive(Debug)]
struct ListenerGuard {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ListenerGuard {
    fn take(&self) -> Option<JoinHandle<()>> {
        self.handle.lock().ok().and_then(|mut handle| handle.take())
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.take() {
            handle.abort();
        }
    }
}

/// Session manager.
///
/// # Example
///
/// ```rust,ignore
/// let manager = SessionManager::start(env, SessionConfig::from_env());
///
/// match manager.login("a@x.com", "secret").await {
///     Ok(identity) => tracing::info!(%identity.id, "Signed in"),
///     Err(error) => show(error.user_message()),
/// }
/// ```
pub struct SessionManager<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    store: SessionStore<P, S>,
    config: SessionConfig,
    listener: Arc<ListenerGuard>,
}

impl<P, S> Clone for SessionManager<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            listener: Arc::clone(&self.listener),
        }
    }
}

impl<P, S> SessionManager<P, S>
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    /// Start the session: subscribe to identity notifications and begin
    /// publishing [`Session`] snapshots.
    ///
    /// The session is `Initializing` and loading until the provider's first
    /// notification has been resolved.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the notification
    /// listener is spawned on it.
    #[must_use]
    pub fn start(env: SessionEnvironment<P, S>, config: SessionConfig) -> Self {
        let subscription = env.auth.subscribe();
        let store = Store::with_broadcast_capacity(
            Session::default(),
            SessionReducer::new(),
            env,
            config.broadcast_capacity,
        );

        let handle = tokio::spawn(forward_notifications(store.clone(), subscription));
        tracing::info!("Session manager started");

        Self {
            store,
            config,
            listener: Arc::new(ListenerGuard {
                handle: Mutex::new(Some(handle)),
            }),
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.store.watch_state().borrow().clone()
    }

    /// Receiver notified after every session transition.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.store.watch_state()
    }

    /// Wait until the published session satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Timeout`]: still unsatisfied after `timeout`
    /// - [`SessionError::ShuttingDown`]: the store went away
    pub async fn wait_until<F>(&self, predicate: F, timeout: Duration) -> Result<Session>
    where
        F: Fn(&Session) -> bool,
    {
        Ok(self.store.wait_for_state(predicate, timeout).await?)
    }

    /// Sign in with email and password.
    ///
    /// The profile is loaded by the identity notification that follows, not
    /// by this call.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`](crate::AuthError), also recorded
    /// as the session's last error.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let request_id = RequestId::new();
        let action = SessionAction::Login {
            request_id,
            credentials: Credentials::new(email, password),
        };

        self.dispatch(request_id, action)
            .await?
            .into_identity()
            .ok_or(SessionError::UnexpectedOutcome)
    }

    /// Create a password account and write its profile document.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Auth`]: account creation failed, nothing was written
    /// - [`SessionError::Store`]: the account exists but its profile could
    ///   not be written
    #[tracing::instrument(skip(self, password, seed))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        seed: ProfileSeed,
    ) -> Result<Identity> {
        let request_id = RequestId::new();
        let action = SessionAction::Signup {
            request_id,
            credentials: Credentials::new(email, password),
            seed,
        };

        self.dispatch(request_id, action)
            .await?
            .into_identity()
            .ok_or(SessionError::UnexpectedOutcome)
    }

    /// Run the federated sign-in flow.
    ///
    /// Writes a profile from the identity only if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns the provider's error (including
    /// [`AuthError::Cancelled`](crate::AuthError::Cancelled)) or the store's.
    #[tracing::instrument(skip(self))]
    pub async fn login_with_federated_provider(&self) -> Result<Identity> {
        let request_id = RequestId::new();
        let action = SessionAction::LoginWithFederatedProvider { request_id };

        self.dispatch(request_id, action)
            .await?
            .into_identity()
            .ok_or(SessionError::UnexpectedOutcome)
    }

    /// Sign out. The session moves to `SignedOut` on the notification that
    /// follows.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if sign-out itself failed.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let request_id = RequestId::new();
        match self.dispatch(request_id, SessionAction::Logout { request_id }).await? {
            OperationOutcome::SignedOut => Ok(()),
            OperationOutcome::SignedIn { .. } => Err(SessionError::UnexpectedOutcome),
        }
    }

    /// Stop listening for notifications and wait for in-flight work.
    ///
    /// Operations already running still complete and report their result.
    /// Operations called afterwards fail with [`SessionError::ShuttingDown`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ShuttingDown`] if effects were still running
    /// when the shutdown timeout expired.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(handle) = self.listener.take() {
            handle.abort();
            // Resolves once the task, and the subscription it owns, are dropped
            let _ = handle.await;
            tracing::debug!("Identity subscription released");
        }

        self.store
            .shutdown(self.config.shutdown_timeout)
            .await
            .map_err(SessionError::from)
    }

    /// Send an operation and wait for its completion.
    ///
    /// The completion has already been reduced when this returns, so a
    /// failure is visible in the session's last error.
    async fn dispatch(
        &self,
        request_id: RequestId,
        action: SessionAction,
    ) -> Result<OperationOutcome> {
        let completion = self
            .store
            .send_and_wait_for(
                action,
                move |action| action.completes(request_id),
                self.config.operation_timeout,
            )
            .await;

        match completion {
            Ok(SessionAction::OperationCompleted { result, .. }) => result,
            Ok(_) => Err(SessionError::UnexpectedOutcome),
            Err(RuntimeError::Timeout) => {
                if let Err(error) = self
                    .store
                    .send(SessionAction::OperationTimedOut { request_id })
                    .await
                {
                    tracing::debug!(%error, "Could not record operation timeout");
                }
                Err(SessionError::Timeout)
            },
            Err(error) => Err(error.into()),
        }
    }
}

/// Forward every notification into the store, in emission order.
async fn forward_notifications<P, S>(store: SessionStore<P, S>, mut subscription: IdentitySubscription)
where
    P: AuthProvider + Clone,
    S: ProfileStore + Clone,
{
    while let Some(identity) = subscription.recv().await {
        tracing::debug!(
            identity_id = identity.as_ref().map(|identity| identity.id.as_str()),
            "Identity notification"
        );
        if let Err(error) = store.send(SessionAction::IdentityChanged { identity }).await {
            tracing::debug!(%error, "Stopped forwarding identity notifications");
            break;
        }
    }
}
