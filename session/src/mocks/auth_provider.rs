//! Mock auth provider for testing.

use crate::error::AuthError;
use crate::identity::Identity;
use crate::providers::{AuthProvider, IdentitySubscription};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Shortest password the mock provider accepts.
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug)]
struct Account {
    password: String,
    identity: Identity,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
    subscribers: Vec<mpsc::UnboundedSender<Option<Identity>>>,
    federated: Option<Identity>,
    failures: VecDeque<AuthError>,
    latency: Duration,
    message_prefix: String,
    next_id: u64,
}

impl State {
    /// Record `identity` as current and notify every live subscriber.
    fn set_current(&mut self, identity: Option<Identity>) {
        self.current.clone_from(&identity);
        self.subscribers
            .retain(|subscriber| subscriber.send(identity.clone()).is_ok());
    }
}

/// Mock auth provider.
///
/// Keeps accounts in memory and emits identity notifications the way a real
/// provider does: the current identity on subscribe, then one per change.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    state: Arc<Mutex<State>>,
}

impl MockAuthProvider {
    /// Create a mock provider with no accounts and nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                message_prefix: "Firebase: ".to_string(),
                ..State::default()
            })),
        }
    }

    /// Seed a password account.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, identity: Identity) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    identity,
                },
            );
        }
        self
    }

    /// Identity returned by the federated flow. Without one the flow is cancelled.
    #[must_use]
    pub fn with_federated_identity(self, identity: Identity) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.federated = Some(identity);
        }
        self
    }

    /// Delay every provider call.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.latency = latency;
        }
        self
    }

    /// Vendor prefix used by [`fail_next_with_message`](Self::fail_next_with_message).
    #[must_use]
    pub fn with_message_prefix(self, prefix: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.message_prefix = prefix.into();
        }
        self
    }

    /// Fail the next provider call with `error`.
    pub fn fail_next(&self, error: AuthError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push_back(error);
        }
    }

    /// Fail the next provider call with a raw vendor message.
    pub fn fail_next_with_message(&self, raw: &str) {
        if let Ok(mut state) = self.state.lock() {
            let error = AuthError::from_provider_message(raw, &state.message_prefix);
            state.failures.push_back(error);
        }
    }

    /// Emit an identity notification without any operation, as when the
    /// provider restores or expires a session on its own.
    pub fn emit(&self, identity: Option<Identity>) {
        if let Ok(mut state) = self.state.lock() {
            state.set_current(identity);
        }
    }

    /// Identity the provider currently considers signed in.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.lock().ok().and_then(|state| state.current.clone())
    }

    /// Number of subscriptions that have not been dropped.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().map_or(0, |state| {
            state
                .subscribers
                .iter()
                .filter(|subscriber| !subscriber.is_closed())
                .count()
        })
    }

    async fn delay(state: &Arc<Mutex<State>>) {
        let latency = state.lock().map_or(Duration::ZERO, |state| state.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(state: &Mutex<State>) -> Result<std::sync::MutexGuard<'_, State>, AuthError> {
    state.lock().map_err(|_| AuthError::Provider {
        code: None,
        message: "mock provider state poisoned".to_string(),
    })
}

impl AuthProvider for MockAuthProvider {
    fn subscribe(&self) -> IdentitySubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        if let Ok(mut state) = self.state.lock() {
            let _ = sender.send(state.current.clone());
            state.subscribers.push(sender);
        }
        IdentitySubscription::new(receiver)
    }

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        let state = Arc::clone(&self.state);
        let email = email.to_string();
        let password = password.to_string();

        async move {
            Self::delay(&state).await;
            let mut guard = lock(&state)?;
            if let Some(error) = guard.failures.pop_front() {
                return Err(error);
            }

            let identity = guard
                .accounts
                .get(&email)
                .filter(|account| account.password == password)
                .map(|account| account.identity.clone())
                .ok_or(AuthError::InvalidCredentials)?;

            guard.set_current(Some(identity.clone()));
            Ok(identity)
        }
    }

    fn create_account_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        let state = Arc::clone(&self.state);
        let email = email.to_string();
        let password = password.to_string();

        async move {
            Self::delay(&state).await;
            let mut guard = lock(&state)?;
            if let Some(error) = guard.failures.pop_front() {
                return Err(error);
            }
            if guard.accounts.contains_key(&email) {
                return Err(AuthError::EmailAlreadyInUse);
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(AuthError::WeakPassword);
            }

            guard.next_id += 1;
            let identity = Identity::new(format!("uid-{}", guard.next_id)).with_email(email.clone());
            guard.accounts.insert(
                email,
                Account {
                    password,
                    identity: identity.clone(),
                },
            );

            guard.set_current(Some(identity.clone()));
            Ok(identity)
        }
    }

    fn sign_in_with_federated_provider(
        &self,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            Self::delay(&state).await;
            let mut guard = lock(&state)?;
            if let Some(error) = guard.failures.pop_front() {
                return Err(error);
            }

            let identity = guard.federated.clone().ok_or(AuthError::Cancelled)?;
            guard.set_current(Some(identity.clone()));
            Ok(identity)
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            Self::delay(&state).await;
            let mut guard = lock(&state)?;
            if let Some(error) = guard.failures.pop_front() {
                return Err(error);
            }

            guard.set_current(None);
            Ok(())
        }
    }
}
