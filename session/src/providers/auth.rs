//! Auth provider trait.

use crate::error::AuthError;
use crate::identity::Identity;
use std::future::Future;
use tokio::sync::mpsc;

/// Stream of identity-change notifications.
///
/// The provider delivers the current identity (or `None`) as soon as the
/// subscription is created, then one value per change, in emission order.
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct IdentitySubscription {
    receiver: mpsc::UnboundedReceiver<Option<Identity>>,
}

impl IdentitySubscription {
    /// Wrap the receiving half of a provider's notification channel.
    #[must_use]
    pub const fn new(receiver: mpsc::UnboundedReceiver<Option<Identity>>) -> Self {
        Self { receiver }
    }

    /// Next notification.
    ///
    /// The outer `None` means the provider closed the subscription; the inner
    /// value is the identity being reported.
    pub async fn recv(&mut self) -> Option<Option<Identity>> {
        self.receiver.recv().await
    }
}

/// Auth provider.
///
/// This trait abstracts over the external identity service.
pub trait AuthProvider: Send + Sync + 'static {
    /// Register for identity-change notifications.
    fn subscribe(&self) -> IdentitySubscription;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Credentials are rejected → `AuthError::InvalidCredentials`
    /// - The provider is unreachable → `AuthError::Network`
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Create a password account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - An account exists for the email → `AuthError::EmailAlreadyInUse`
    /// - The password is rejected → `AuthError::WeakPassword`
    fn create_account_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Run the federated sign-in interaction.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The user abandons the flow → `AuthError::Cancelled`
    /// - The provider fails the flow
    fn sign_in_with_federated_provider(
        &self,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Sign the current identity out.
    ///
    /// # Errors
    ///
    /// Returns error if the provider's sign-out call fails.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}
