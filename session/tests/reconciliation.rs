//! Profile reconciliation ordering: lookups are applied by notification
//! recency, never by completion order.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use proptest::prelude::*;
use safeguard_core::reducer::Reducer;
use safeguard_session::mocks::{MockAuthProvider, MockProfileStore};
use safeguard_session::{
    Identity, IdentityId, LookupTicket, Profile, ProfileSeed, Session, SessionAction,
    SessionConfig, SessionEnvironment, SessionManager, SessionPhase, SessionReducer,
};
use safeguard_testing::{test_clock, test_time};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn identity(n: u8) -> Identity {
    Identity::new(format!("u{n}")).with_email(format!("u{n}@x.com"))
}

fn profile_for(id: &IdentityId) -> Profile {
    Profile::for_signup(format!("{id}@x.com"), ProfileSeed::new(), test_time())
}

fn env(
    auth: &MockAuthProvider,
    store: &MockProfileStore,
) -> SessionEnvironment<MockAuthProvider, MockProfileStore> {
    SessionEnvironment::new(auth.clone(), store.clone(), Arc::new(test_clock()))
}

#[tokio::test]
async fn slow_lookup_for_previous_identity_never_overwrites() {
    let auth = MockAuthProvider::new();
    let store = MockProfileStore::new()
        .with_profile("u1", profile_for(&IdentityId::new("u1")))
        .with_profile("u2", profile_for(&IdentityId::new("u2")));
    store.set_read_delay("u1", Duration::from_millis(200));
    let manager = SessionManager::start(env(&auth, &store), SessionConfig::default());

    auth.emit(Some(identity(1)));
    auth.emit(Some(identity(2)));
    let session = manager
        .wait_until(|s| s.phase().is_signed_in(), WAIT)
        .await
        .unwrap();
    assert_eq!(session.identity(), Some(&identity(2)));

    // Let the u1 lookup finish
    tokio::time::sleep(Duration::from_millis(300)).await;

    let session = manager.session();
    assert_eq!(session.identity(), Some(&identity(2)));
    assert_eq!(session.profile().map(|p| p.email.as_str()), Some("u2@x.com"));
}

#[tokio::test]
async fn repeated_notification_shares_one_lookup() {
    let auth = MockAuthProvider::new();
    let store = MockProfileStore::new();
    store.set_read_delay("u1", Duration::from_millis(100));
    let manager = SessionManager::start(env(&auth, &store), SessionConfig::default());
    manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    auth.emit(Some(identity(1)));
    auth.emit(Some(identity(1)));
    manager
        .wait_until(|s| s.phase().is_signed_in(), WAIT)
        .await
        .unwrap();

    assert_eq!(store.read_count(), 1);
}

#[tokio::test]
async fn failed_lookup_stays_pending_without_error() {
    let auth = MockAuthProvider::new();
    auth.emit(Some(identity(1)));
    let store = MockProfileStore::new();
    store.set_fail_reads(true);
    let manager = SessionManager::start(env(&auth, &store), SessionConfig::default());

    let session = manager.wait_until(|s| !s.is_loading(), WAIT).await.unwrap();

    assert_eq!(
        session.phase(),
        &SessionPhase::SignedInProfilePending {
            identity: identity(1)
        }
    );
    assert!(session.last_error().is_none());
}

#[derive(Debug, Clone)]
enum Step {
    Notify(Option<u8>),
    Resolve(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        proptest::option::of(0u8..3).prop_map(Step::Notify),
        (0usize..8).prop_map(Step::Resolve),
    ]
}

proptest! {
    #[test]
    fn published_profile_belongs_to_latest_identity(steps in proptest::collection::vec(step(), 1..40)) {
        let reducer = SessionReducer::<MockAuthProvider, MockProfileStore>::new();
        let env = env(&MockAuthProvider::new(), &MockProfileStore::new());
        let mut session = Session::default();
        let mut issued: Vec<LookupTicket> = Vec::new();
        let mut latest: Option<Identity> = None;

        for step in steps {
            match step {
                Step::Notify(n) => {
                    let notified = n.map(identity);
                    latest.clone_from(&notified);
                    let _ = reducer.reduce(
                        &mut session,
                        SessionAction::IdentityChanged { identity: notified },
                        &env,
                    );
                    if let Some(ticket) = session.pending_lookup() {
                        if !issued.contains(ticket) {
                            issued.push(ticket.clone());
                        }
                    }
                },
                Step::Resolve(index) => {
                    if issued.is_empty() {
                        continue;
                    }
                    // Results may arrive in any order, including twice
                    let ticket = issued[index % issued.len()].clone();
                    let result = Ok(Some(profile_for(&ticket.identity_id)));
                    let _ = reducer.reduce(
                        &mut session,
                        SessionAction::ProfileLoaded { ticket, result },
                        &env,
                    );
                },
            }

            prop_assert_eq!(session.identity(), latest.as_ref());
            if let Some(profile) = session.profile() {
                let expected = latest.as_ref().and_then(|identity| identity.email.clone());
                prop_assert_eq!(Some(profile.email.clone()), expected);
            }
        }
    }
}
