//! Mock provider implementations for testing.
//!
//! In-memory implementations of both provider traits, for unit tests,
//! integration tests and the demo.

pub mod auth_provider;
pub mod profile_store;

pub use auth_provider::MockAuthProvider;
pub use profile_store::MockProfileStore;
