//! External providers.
//!
//! This module defines traits for the two external dependencies of the
//! session manager. These traits enable dependency injection and make the
//! session logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. The reducer depends on
//! these traits, and the application supplies concrete implementations:
//!
//! ```text
//! ┌──────────────────┐   notifications   ┌──────────────────┐
//! │ AuthProvider     │──────────────────▶│ SessionManager   │
//! │ - sign in / out  │                   │ (Store + Reducer)│
//! │ - subscribe      │◀──────────────────│                  │
//! └──────────────────┘    operations     └────────┬─────────┘
//!                                                 │ get / set
//!                                                 ▼
//!                                        ┌──────────────────┐
//!                                        │ ProfileStore     │
//!                                        │ (document store) │
//!                                        └──────────────────┘
//! ```
//!
//! The wire protocol of any particular vendor lives in those implementations.

pub mod auth;
pub mod profile_store;

// Re-export provider traits
pub use auth::{AuthProvider, IdentitySubscription};
pub use profile_store::ProfileStore;
