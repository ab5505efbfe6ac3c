//! Identities issued by the external auth provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable account identifier assigned by the auth provider.
///
/// Also the key of the account's profile document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Wrap a provider-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for IdentityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Authenticated account as reported by the auth provider.
///
/// Identities are values: a new sign-in produces a new `Identity`, the
/// session never edits one in place. Federated providers may omit the email.
///
/// # Examples
///
/// ```
/// # use safeguard_session::Identity;
/// let identity = Identity::new("u1").with_email("a@x.com");
/// assert_eq!(identity.id.as_str(), "u1");
/// assert_eq!(identity.email.as_deref(), Some("a@x.com"));
/// assert!(identity.display_name.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account identifier.
    pub id: IdentityId,

    /// Email address, if the provider shares one.
    pub email: Option<String>,

    /// Display name, if the provider shares one.
    pub display_name: Option<String>,

    /// Avatar URL, if the provider shares one.
    pub photo_url: Option<String>,
}

impl Identity {
    /// Identity with only an id.
    #[must_use]
    pub fn new(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    /// Set the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
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
}
