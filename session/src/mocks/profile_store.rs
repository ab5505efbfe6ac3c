//! Mock profile store for testing.

use crate::error::StoreError;
use crate::identity::IdentityId;
use crate::profile::Profile;
use crate::providers::ProfileStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    documents: HashMap<IdentityId, Profile>,
    read_delays: HashMap<IdentityId, Duration>,
    writes: HashMap<IdentityId, usize>,
    read_count: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// Mock profile store.
///
/// Uses in-memory storage for testing. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockProfileStore {
    state: Arc<Mutex<State>>,
}

impl MockProfileStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile document.
    #[must_use]
    pub fn with_profile(self, identity_id: impl Into<IdentityId>, profile: Profile) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.documents.insert(identity_id.into(), profile);
        }
        self
    }

    /// Delay reads of one identity's document.
    pub fn set_read_delay(&self, identity_id: impl Into<IdentityId>, delay: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.read_delays.insert(identity_id.into(), delay);
        }
    }

    /// Make every read fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_reads = fail;
        }
    }

    /// Make every write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_writes = fail;
        }
    }

    /// Stored document for an identity.
    #[must_use]
    pub fn profile(&self, identity_id: impl Into<IdentityId>) -> Option<Profile> {
        let identity_id = identity_id.into();
        self.state
            .lock()
            .ok()
            .and_then(|state| state.documents.get(&identity_id).cloned())
    }

    /// Successful writes across all identities.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state
            .lock()
            .map_or(0, |state| state.writes.values().sum())
    }

    /// Successful writes for one identity.
    #[must_use]
    pub fn writes_for(&self, identity_id: impl Into<IdentityId>) -> usize {
        let identity_id = identity_id.into();
        self.state
            .lock()
            .map_or(0, |state| state.writes.get(&identity_id).copied().unwrap_or(0))
    }

    /// Reads attempted, including failed ones.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.read_count)
    }
}

impl ProfileStore for MockProfileStore {
    fn get_profile(
        &self,
        identity_id: &IdentityId,
    ) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send {
        let state = Arc::clone(&self.state);
        let identity_id = identity_id.clone();

        async move {
            let delay = state
                .lock()
                .map_err(|_| StoreError::Unavailable)?
                .read_delays
                .get(&identity_id)
                .copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut guard = state.lock().map_err(|_| StoreError::Unavailable)?;
            guard.read_count += 1;
            if guard.fail_reads {
                return Err(StoreError::Read(format!("read of {identity_id} rejected")));
            }
            Ok(guard.documents.get(&identity_id).cloned())
        }
    }

    fn set_profile(
        &self,
        identity_id: &IdentityId,
        profile: &Profile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let state = Arc::clone(&self.state);
        let identity_id = identity_id.clone();
        let profile = profile.clone();

        async move {
            let mut guard = state.lock().map_err(|_| StoreError::Unavailable)?;
            if guard.fail_writes {
                return Err(StoreError::Write(format!("write of {identity_id} rejected")));
            }
            *guard.writes.entry(identity_id.clone()).or_default() += 1;
            guard.documents.insert(identity_id, profile);
            Ok(())
        }
    }
}
