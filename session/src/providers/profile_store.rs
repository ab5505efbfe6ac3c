//! Profile store trait.

use crate::error::StoreError;
use crate::identity::IdentityId;
use crate::profile::Profile;
use std::future::Future;

/// Profile document store, keyed by identity id.
pub trait ProfileStore: Send + Sync + 'static {
    /// Get the profile document for an identity.
    ///
    /// # Returns
    ///
    /// `None` if no document exists.
    ///
    /// # Errors
    ///
    /// Returns error if the read fails.
    fn get_profile(
        &self,
        identity_id: &IdentityId,
    ) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send;

    /// Write the profile document for an identity, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn set_profile(
        &self,
        identity_id: &IdentityId,
        profile: &Profile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
