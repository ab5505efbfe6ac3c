//! # Safeguard Testing
//!
//! Testing utilities for the Safeguard session architecture.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits (`FixedClock`)
//! - A Given-When-Then harness for reducers (`ReducerTest`)
//! - Effect assertion helpers
//!
//! ## Example
//!
//! ```ignore
//! use safeguard_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(SessionReducer::new())
//!     .with_env(test_environment(test_clock()))
//!     .given_state(Session::default())
//!     .when_action(SessionAction::IdentityChanged { identity: None })
//!     .then_state(|session| assert!(!session.is_loading()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use safeguard_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making timestamps in assertions exact.
    ///
    /// # Example
    ///
    /// ```
    /// use safeguard_testing::mocks::FixedClock;
    /// use safeguard_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant returned by [`test_clock`]
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock, test_time};
