//! Session manager walkthrough.
//!
//! Runs the session manager against the in-memory providers:
//!
//! 1. Startup with nobody signed in
//! 2. Signup (form validation first), then logout
//! 3. A rejected login, then a good one
//! 4. Federated sign-in twice: the profile is written only once
//!
//! ```bash
//! RUST_LOG=session_demo=info cargo run -p session-demo
//! ```

use safeguard_core::environment::SystemClock;
use safeguard_session::mocks::{MockAuthProvider, MockProfileStore};
use safeguard_session::validation::validate_signup;
use safeguard_session::{
    Identity, ProfileSeed, Session, SessionConfig, SessionEnvironment, SessionError,
    SessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WAIT: Duration = Duration::from_secs(5);

fn describe(session: &Session) {
    tracing::info!(
        phase = ?session.phase(),
        loading = session.is_loading(),
        error = ?session.last_error().map(SessionError::user_message),
        "Session"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_demo=debug,safeguard_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = SessionConfig::from_env();
    tracing::info!(?config, "Starting session demo");

    let auth = MockAuthProvider::new()
        .with_message_prefix(config.provider_message_prefix.clone())
        .with_latency(Duration::from_millis(50))
        .with_federated_identity(
            Identity::new("google-42")
                .with_email("gee@example.com")
                .with_display_name("Gee"),
        );
    let profiles = MockProfileStore::new();
    let env = SessionEnvironment::new(auth.clone(), profiles.clone(), Arc::new(SystemClock));
    let manager = SessionManager::start(env, config.clone());

    // Presentation layer: re-render on every transition
    let mut updates = manager.watch();
    let renderer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let session = updates.borrow_and_update().clone();
            describe(&session);
        }
    });

    manager.wait_until(|s| !s.is_loading(), WAIT).await?;

    // 2. Signup
    if let Err(error) = validate_signup("bea123", "bea124", config.min_password_len) {
        tracing::info!(%error, "Signup form rejected");
    }
    validate_signup("bea12345", "bea12345", config.min_password_len)?;
    let seed = ProfileSeed::new()
        .with_display_name("Bea")
        .with_field("emergencyContact", "+15550100");
    let identity = manager.signup("bea@example.com", "bea12345", seed).await?;
    let session = manager.wait_until(|s| s.profile().is_some(), WAIT).await?;
    tracing::info!(identity_id = %identity.id, profile = ?session.profile(), "Signed up");

    manager.logout().await?;
    manager.wait_until(|s| s.phase().is_signed_out(), WAIT).await?;

    // 3. Login
    if let Err(error) = manager.login("bea@example.com", "wrong-password").await {
        tracing::info!(message = %error.user_message(), "Login rejected");
    }
    manager.login("bea@example.com", "bea12345").await?;
    manager.wait_until(|s| s.profile().is_some(), WAIT).await?;
    manager.logout().await?;
    manager.wait_until(|s| s.phase().is_signed_out(), WAIT).await?;

    // 4. Federated sign-in, twice
    for attempt in 1..=2 {
        manager.login_with_federated_provider().await?;
        let session = manager
            .wait_until(|s| s.profile().is_some() && s.pending_lookup().is_none(), WAIT)
            .await?;
        tracing::info!(
            attempt,
            created_at = ?session.profile().map(|profile| profile.created_at),
            writes = profiles.writes_for("google-42"),
            "Federated sign-in"
        );
    }

    manager.shutdown().await?;
    renderer.abort();
    tracing::info!(subscribers = auth.subscriber_count(), "Session demo finished");

    Ok(())
}
