//! Application-owned profile documents.
//!
//! One profile document exists per [`IdentityId`](crate::IdentityId) once the
//! account has completed its first sign-in. Field names on the wire are
//! camelCase (`displayName`, `photoURL`, `createdAt`) to match the documents
//! already in the store.

use crate::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document keys owned by [`Profile`]'s typed fields.
const RESERVED_KEYS: [&str; 5] = ["email", "displayName", "photoURL", "createdAt", "provider"];

/// How the account was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountProvider {
    /// Email and password signup.
    #[default]
    Password,

    /// Federated ("continue with ...") sign-in.
    Federated,
}

/// Profile document stored per identity.
///
/// `created_at` is written once and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Email address at creation time.
    pub email: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Avatar URL.
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// When the document was first written.
    pub created_at: DateTime<Utc>,

    /// How the account was created. Older documents carry no tag and are
    /// password accounts.
    #[serde(default)]
    pub provider: AccountProvider,

    /// Additional fields supplied at signup.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Profile {
    /// Profile written by a password signup.
    ///
    /// Seed extras whose key collides with a typed field are dropped; the
    /// email and timestamp always come from the signup itself.
    #[must_use]
    pub fn for_signup(email: impl Into<String>, seed: ProfileSeed, created_at: DateTime<Utc>) -> Self {
        let ProfileSeed {
            display_name,
            photo_url,
            mut extra,
        } = seed;
        extra.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

        Self {
            email: email.into(),
            display_name,
            photo_url,
            created_at,
            provider: AccountProvider::Password,
            extra,
        }
    }

    /// Profile written on the first federated sign-in, copied from the identity.
    #[must_use]
    pub fn for_federated(identity: &Identity, created_at: DateTime<Utc>) -> Self {
        Self {
            email: identity.email.clone().unwrap_or_default(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            created_at,
            provider: AccountProvider::Federated,
            extra: BTreeMap::new(),
        }
    }
}

/// Caller-supplied data merged into the profile created at signup.
///
/// # Examples
///
/// ```
/// # use safeguard_session::ProfileSeed;
/// let seed = ProfileSeed::new()
///     .with_display_name("Bea")
///     .with_field("emergencyContact", "+15550100");
/// assert_eq!(seed.display_name.as_deref(), Some("Bea"));
/// assert_eq!(seed.extra.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSeed {
    /// Display name chosen at signup.
    pub display_name: Option<String>,

    /// Avatar URL chosen at signup.
    pub photo_url: Option<String>,

    /// Any other document fields.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProfileSeed {
    /// Empty seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Add an extra document field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
