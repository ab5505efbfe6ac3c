//! Session configuration.
//!
//! Values should be provided by the application, or read from the process
//! environment with [`SessionConfig::from_env`].

use std::time::Duration;

/// Session manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long an operation call waits for its completion.
    ///
    /// Default: 30 seconds
    pub operation_timeout: Duration,

    /// How long `shutdown` waits for in-flight effects.
    ///
    /// Default: 5 seconds
    pub shutdown_timeout: Duration,

    /// Capacity of the internal action broadcast channel.
    ///
    /// Default: 64
    pub broadcast_capacity: usize,

    /// Vendor prefix stripped from provider error messages.
    ///
    /// Default: `"Firebase: "`
    pub provider_message_prefix: String,

    /// Minimum password length enforced by signup validation.
    ///
    /// Default: 6
    pub min_password_len: usize,
}

impl SessionConfig {
    /// Default operation timeout in seconds.
    pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

    /// Default shutdown timeout in seconds.
    pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

    /// Default broadcast capacity.
    pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

    /// Default vendor prefix.
    pub const DEFAULT_PROVIDER_MESSAGE_PREFIX: &'static str = "Firebase: ";

    /// Default minimum password length.
    pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

    /// Create configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `SAFEGUARD_*` environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SAFEGUARD_OPERATION_TIMEOUT_SECS` | 30 |
    /// | `SAFEGUARD_SHUTDOWN_TIMEOUT_SECS` | 5 |
    /// | `SAFEGUARD_BROADCAST_CAPACITY` | 64 |
    /// | `SAFEGUARD_PROVIDER_MESSAGE_PREFIX` | `"Firebase: "` |
    /// | `SAFEGUARD_MIN_PASSWORD_LEN` | 6 |
    #[must_use]
    pub fn from_env() -> Self {
        let operation_timeout = parse_var("SAFEGUARD_OPERATION_TIMEOUT_SECS")
            .unwrap_or(Self::DEFAULT_OPERATION_TIMEOUT_SECS);
        let shutdown_timeout = parse_var("SAFEGUARD_SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or(Self::DEFAULT_SHUTDOWN_TIMEOUT_SECS);

        Self {
            operation_timeout: Duration::from_secs(operation_timeout),
            shutdown_timeout: Duration::from_secs(shutdown_timeout),
            broadcast_capacity: parse_var("SAFEGUARD_BROADCAST_CAPACITY")
                .filter(|capacity| *capacity > 0)
                .unwrap_or(Self::DEFAULT_BROADCAST_CAPACITY),
            provider_message_prefix: std::env::var("SAFEGUARD_PROVIDER_MESSAGE_PREFIX")
                .unwrap_or_else(|_| Self::DEFAULT_PROVIDER_MESSAGE_PREFIX.to_string()),
            min_password_len: parse_var("SAFEGUARD_MIN_PASSWORD_LEN")
                .unwrap_or(Self::DEFAULT_MIN_PASSWORD_LEN),
        }
    }

    /// Set operation timeout.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set shutdown timeout.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set broadcast capacity. Zero is raised to one.
    #[must_use]
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    /// Set the vendor prefix stripped from provider messages.
    #[must_use]
    pub fn with_provider_message_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.provider_message_prefix = prefix.into();
        self
    }

    /// Set minimum password length.
    #[must_use]
    pub const fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(Self::DEFAULT_OPERATION_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(Self::DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            broadcast_capacity: Self::DEFAULT_BROADCAST_CAPACITY,
            provider_message_prefix: Self::DEFAULT_PROVIDER_MESSAGE_PREFIX.to_string(),
            min_password_len: Self::DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();

        assert_eq!(config.operation_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.provider_message_prefix, "Firebase: ");
        assert_eq!(config.min_password_len, 6);
    }

    #[test]
    fn builder_overrides() {
        let config = SessionConfig::new()
            .with_operation_timeout(Duration::from_millis(250))
            .with_broadcast_capacity(0)
            .with_provider_message_prefix("Vendor: ")
            .with_min_password_len(12);

        assert_eq!(config.operation_timeout, Duration::from_millis(250));
        assert_eq!(config.broadcast_capacity, 1);
        assert_eq!(config.provider_message_prefix, "Vendor: ");
        assert_eq!(config.min_password_len, 12);
    }

    #[test]
    fn unset_variable_parses_to_none() {
        assert_eq!(parse_var::<u64>("SAFEGUARD_TEST_VARIABLE_THAT_IS_NEVER_SET"), None);
    }
}
