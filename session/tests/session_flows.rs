//! Integration tests for the session manager's operations.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use safeguard_core::environment::Clock;
use safeguard_core::{DateTime, Utc};
use safeguard_session::mocks::{MockAuthProvider, MockProfileStore};
use safeguard_session::{
    AccountProvider, AuthError, Identity, Profile, ProfileSeed, SessionConfig,
    SessionEnvironment, SessionError, SessionManager, SessionPhase, StoreError,
};
use safeguard_testing::{test_clock, test_time};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

type Manager = SessionManager<MockAuthProvider, MockProfileStore>;

fn start(auth: &MockAuthProvider, store: &MockProfileStore) -> Manager {
    start_with(auth, store, Arc::new(test_clock()), SessionConfig::default())
}

fn start_with(
    auth: &MockAuthProvider,
    store: &MockProfileStore,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
) -> Manager {
    let env = SessionEnvironment::new(auth.clone(), store.clone(), clock);
    SessionManager::start(env, config)
}

/// Clock that moves forward a minute on every read.
struct TickingClock(AtomicI64);

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.0.fetch_add(60, Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
    }
}

fn alice() -> Identity {
    Identity::new("u1").with_email("a@x.com")
}

#[tokio::test]
async fn fresh_start_without_identity_resolves_to_signed_out() {
    let manager = start(&MockAuthProvider::new(), &MockProfileStore::new());

    let session = manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    assert_eq!(session.phase(), &SessionPhase::SignedOut);
    assert!(session.identity().is_none());
    assert!(session.profile().is_none());
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn restored_identity_is_loaded_at_startup() {
    let auth = MockAuthProvider::new();
    auth.emit(Some(alice()));
    let store = MockProfileStore::new().with_profile(
        "u1",
        Profile::for_signup("a@x.com", ProfileSeed::new(), test_time()),
    );
    let manager = start(&auth, &store);

    let session = manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    assert_eq!(session.identity(), Some(&alice()));
    assert_eq!(session.profile().map(|p| p.email.as_str()), Some("a@x.com"));
}

#[tokio::test]
async fn login_without_profile_document_signs_in_with_no_profile() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    let store = MockProfileStore::new();
    let manager = start(&auth, &store);

    let identity = manager.login("a@x.com", "secret").await.unwrap();
    let session = manager
        .wait_until(|s| s.phase().is_signed_in(), WAIT)
        .await
        .unwrap();

    assert_eq!(identity, alice());
    assert_eq!(session.identity(), Some(&alice()));
    assert!(session.profile().is_none());
    assert!(session.last_error().is_none());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn signup_writes_profile_and_rejects_duplicate_email() {
    let auth = MockAuthProvider::new();
    let store = MockProfileStore::new();
    let manager = start(&auth, &store);

    let identity = manager
        .signup("b@x.com", "secret1", ProfileSeed::new().with_display_name("Bea"))
        .await
        .unwrap();
    let session = manager
        .wait_until(|s| s.profile().is_some(), WAIT)
        .await
        .unwrap();

    let profile = session.profile().unwrap();
    assert_eq!(session.identity(), Some(&identity));
    assert_eq!(profile.email, "b@x.com");
    assert_eq!(profile.display_name.as_deref(), Some("Bea"));
    assert_eq!(profile.created_at, test_time());
    assert_eq!(profile.provider, AccountProvider::Password);
    assert_eq!(store.writes_for(identity.id.clone()), 1);

    let duplicate = manager.signup("b@x.com", "another1", ProfileSeed::new()).await;

    assert_eq!(duplicate, Err(SessionError::Auth(AuthError::EmailAlreadyInUse)));
    assert_eq!(store.write_count(), 1);
    let session = manager.session();
    assert_eq!(
        session.last_error(),
        Some(&SessionError::Auth(AuthError::EmailAlreadyInUse))
    );
    assert_eq!(session.identity(), Some(&identity));
}

#[tokio::test]
async fn signup_overwrites_an_existing_document() {
    let auth = MockAuthProvider::new();
    let store = MockProfileStore::new().with_profile(
        "uid-1",
        Profile::for_signup("old@x.com", ProfileSeed::new(), test_time()),
    );
    let manager = start(&auth, &store);

    manager
        .signup("c@x.com", "secret1", ProfileSeed::new())
        .await
        .unwrap();

    assert_eq!(store.writes_for("uid-1"), 1);
    assert_eq!(store.profile("uid-1").map(|p| p.email), Some("c@x.com".to_string()));
}

#[tokio::test]
async fn signup_profile_write_failure_keeps_the_account() {
    let auth = MockAuthProvider::new();
    let store = MockProfileStore::new();
    store.set_fail_writes(true);
    let manager = start(&auth, &store);

    let result = manager.signup("d@x.com", "secret1", ProfileSeed::new()).await;

    assert!(matches!(result, Err(SessionError::Store(StoreError::Write(_)))));
    let session = manager
        .wait_until(|s| s.identity().is_some() && s.pending_lookup().is_none(), WAIT)
        .await
        .unwrap();
    assert!(session.profile().is_none());
    assert!(matches!(
        session.last_error(),
        Some(SessionError::Store(StoreError::Write(_)))
    ));
    assert!(auth.current_identity().is_some());
}

#[tokio::test]
async fn federated_sign_in_creates_profile_only_once() {
    let federated = Identity::new("g1")
        .with_email("g@x.com")
        .with_display_name("Gee")
        .with_photo_url("https://img.example/g1.png");
    let auth = MockAuthProvider::new().with_federated_identity(federated.clone());
    let store = MockProfileStore::new();
    let clock = Arc::new(TickingClock(AtomicI64::new(1_735_689_600)));
    let manager = start_with(&auth, &store, clock, SessionConfig::default());

    manager.login_with_federated_provider().await.unwrap();
    let first = manager
        .wait_until(|s| s.profile().is_some(), WAIT)
        .await
        .unwrap();
    let created = first.profile().unwrap().clone();

    assert_eq!(created.provider, AccountProvider::Federated);
    assert_eq!(created.display_name.as_deref(), Some("Gee"));
    assert_eq!(created.photo_url.as_deref(), Some("https://img.example/g1.png"));

    let identity = manager.login_with_federated_provider().await.unwrap();
    let second = manager
        .wait_until(|s| s.profile().is_some() && s.pending_lookup().is_none(), WAIT)
        .await
        .unwrap();

    assert_eq!(identity, federated);
    assert_eq!(store.writes_for("g1"), 1);
    assert_eq!(store.profile("g1"), Some(created.clone()));
    assert_eq!(second.profile().map(|p| p.created_at), Some(created.created_at));
}

#[tokio::test]
async fn cancelled_federated_flow_is_an_ordinary_error() {
    let manager = start(&MockAuthProvider::new(), &MockProfileStore::new());
    manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    let result = manager.login_with_federated_provider().await;

    assert_eq!(result, Err(SessionError::Auth(AuthError::Cancelled)));
    let session = manager.session();
    assert_eq!(session.phase(), &SessionPhase::SignedOut);
    assert_eq!(session.last_error(), Some(&SessionError::Auth(AuthError::Cancelled)));
}

#[tokio::test]
async fn failed_login_leaves_session_untouched_and_next_operation_clears_error() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    let store = MockProfileStore::new().with_profile(
        "u1",
        Profile::for_signup("a@x.com", ProfileSeed::new(), test_time()),
    );
    let manager = start(&auth, &store);
    manager.login("a@x.com", "secret").await.unwrap();
    let before = manager
        .wait_until(|s| s.profile().is_some(), WAIT)
        .await
        .unwrap();

    let result = manager.login("a@x.com", "wrong").await;

    assert_eq!(result, Err(SessionError::Auth(AuthError::InvalidCredentials)));
    let after = manager.session();
    assert_eq!(after.phase(), before.phase());
    assert!(!after.last_error().unwrap().user_message().is_empty());

    manager.logout().await.unwrap();

    assert!(manager.session().last_error().is_none());
    let session = manager
        .wait_until(|s| s.phase().is_signed_out(), WAIT)
        .await
        .unwrap();
    assert!(session.profile().is_none());
}

#[tokio::test]
async fn vendor_messages_reach_the_caller_without_prefix() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    auth.fail_next_with_message("Firebase: Error (auth/wrong-password).");
    let manager = start(&auth, &MockProfileStore::new());

    let error = manager.login("a@x.com", "secret").await.unwrap_err();

    assert_eq!(error.user_message(), "Invalid email or password");
    assert!(!error.user_message().contains("Firebase"));
}

#[tokio::test]
async fn failed_logout_keeps_identity_and_profile() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    let store = MockProfileStore::new().with_profile(
        "u1",
        Profile::for_signup("a@x.com", ProfileSeed::new(), test_time()),
    );
    let manager = start(&auth, &store);
    manager.login("a@x.com", "secret").await.unwrap();
    let before = manager
        .wait_until(|s| s.profile().is_some(), WAIT)
        .await
        .unwrap();
    auth.fail_next(AuthError::TooManyRequests);

    let result = manager.logout().await;

    assert_eq!(result, Err(SessionError::Auth(AuthError::TooManyRequests)));
    let after = manager.session();
    assert_eq!(after.phase(), before.phase());
    assert_eq!(after.identity(), Some(&alice()));
    assert_eq!(after.profile(), before.profile());
    assert_eq!(
        after.last_error(),
        Some(&SessionError::Auth(AuthError::TooManyRequests))
    );
    assert_eq!(auth.current_identity(), Some(alice()));
}

#[tokio::test]
async fn federated_existence_check_failure_is_recorded() {
    let auth = MockAuthProvider::new().with_federated_identity(Identity::new("g1"));
    let store = MockProfileStore::new();
    store.set_fail_reads(true);
    let manager = start(&auth, &store);
    manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    let result = manager.login_with_federated_provider().await;

    assert!(matches!(result, Err(SessionError::Store(StoreError::Read(_)))));
    assert!(matches!(
        manager.session().last_error(),
        Some(SessionError::Store(StoreError::Read(_)))
    ));
    // The provider's notification still moves the identity; nothing is written
    let session = manager
        .wait_until(|s| s.identity().is_some() && s.pending_lookup().is_none(), WAIT)
        .await
        .unwrap();
    assert!(session.profile().is_none());
    assert!(matches!(
        session.last_error(),
        Some(SessionError::Store(StoreError::Read(_)))
    ));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn federated_profile_write_failure_is_recorded() {
    let auth = MockAuthProvider::new().with_federated_identity(Identity::new("g1"));
    let store = MockProfileStore::new();
    store.set_fail_writes(true);
    let manager = start(&auth, &store);
    manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    let result = manager.login_with_federated_provider().await;

    assert!(matches!(result, Err(SessionError::Store(StoreError::Write(_)))));
    let session = manager
        .wait_until(|s| s.phase().is_signed_in(), WAIT)
        .await
        .unwrap();
    assert_eq!(session.identity().map(|i| i.id.as_str()), Some("g1"));
    assert!(session.profile().is_none());
    assert!(matches!(
        session.last_error(),
        Some(SessionError::Store(StoreError::Write(_)))
    ));
    assert_eq!(store.writes_for("g1"), 0);
}

#[tokio::test]
async fn late_success_clears_the_timeout() {
    let auth = MockAuthProvider::new()
        .with_account("a@x.com", "secret", alice())
        .with_latency(Duration::from_millis(200));
    let config = SessionConfig::default().with_operation_timeout(Duration::from_millis(50));
    let manager = start_with(&auth, &MockProfileStore::new(), Arc::new(test_clock()), config);

    let result = manager.login("a@x.com", "secret").await;
    assert_eq!(result, Err(SessionError::Timeout));
    assert_eq!(manager.session().last_error(), Some(&SessionError::Timeout));

    let session = manager
        .wait_until(|s| s.phase().is_signed_in() && s.last_error().is_none(), WAIT)
        .await
        .unwrap();

    assert_eq!(session.identity(), Some(&alice()));
}

#[tokio::test]
async fn operation_in_flight_during_shutdown_still_reports_its_result() {
    let auth = MockAuthProvider::new()
        .with_account("a@x.com", "secret", alice())
        .with_latency(Duration::from_millis(100));
    let manager = start(&auth, &MockProfileStore::new());
    let pending = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.login("a@x.com", "secret").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    manager.shutdown().await.unwrap();

    assert_eq!(pending.await.unwrap(), Ok(alice()));
    assert!(manager.session().last_error().is_none());
}

#[tokio::test]
async fn failure_in_flight_during_shutdown_is_recorded() {
    let auth = MockAuthProvider::new()
        .with_account("a@x.com", "secret", alice())
        .with_latency(Duration::from_millis(100));
    let manager = start(&auth, &MockProfileStore::new());
    let pending = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.login("a@x.com", "wrong").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    manager.shutdown().await.unwrap();

    let error = pending.await.unwrap().unwrap_err();
    assert_eq!(error, SessionError::Auth(AuthError::InvalidCredentials));
    assert_eq!(manager.session().last_error(), Some(&error));
}

#[tokio::test]
async fn logout_during_startup_ends_signed_out() {
    let auth = MockAuthProvider::new();
    auth.emit(Some(alice()));
    let store = MockProfileStore::new().with_profile(
        "u1",
        Profile::for_signup("a@x.com", ProfileSeed::new(), test_time()),
    );
    store.set_read_delay("u1", Duration::from_millis(200));
    let manager = start(&auth, &store);

    manager.logout().await.unwrap();
    manager
        .wait_until(|s| s.phase().is_signed_out(), WAIT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let session = manager.session();
    assert_eq!(session.phase(), &SessionPhase::SignedOut);
    assert!(session.profile().is_none());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn last_emitted_identity_wins() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    let manager = start(&auth, &MockProfileStore::new());

    manager.logout().await.unwrap();
    manager.login("a@x.com", "secret").await.unwrap();

    let session = manager
        .wait_until(|s| s.phase().is_signed_in(), WAIT)
        .await
        .unwrap();
    assert_eq!(session.identity(), Some(&alice()));
}

#[tokio::test]
async fn external_revocation_signs_out() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    let manager = start(&auth, &MockProfileStore::new());
    manager.login("a@x.com", "secret").await.unwrap();
    manager
        .wait_until(|s| s.phase().is_signed_in(), WAIT)
        .await
        .unwrap();

    auth.emit(None);

    let session = manager
        .wait_until(|s| s.phase().is_signed_out(), WAIT)
        .await
        .unwrap();
    assert!(session.identity().is_none());
}

#[tokio::test]
async fn shutdown_unsubscribes_and_rejects_operations() {
    let auth = MockAuthProvider::new().with_account("a@x.com", "secret", alice());
    let manager = start(&auth, &MockProfileStore::new());
    assert_eq!(auth.subscriber_count(), 1);

    manager.shutdown().await.unwrap();

    assert_eq!(auth.subscriber_count(), 0);
    assert_eq!(
        manager.login("a@x.com", "secret").await,
        Err(SessionError::ShuttingDown)
    );
}

#[tokio::test]
async fn dropping_the_manager_unsubscribes() {
    let auth = MockAuthProvider::new();
    let manager = start(&auth, &MockProfileStore::new());
    let clone = manager.clone();
    drop(manager);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(auth.subscriber_count(), 1);

    drop(clone);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(auth.subscriber_count(), 0);
}
