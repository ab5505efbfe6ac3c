//! # Safeguard Runtime
//!
//! Runtime implementation for the Safeguard session architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **State Publication**: Every reduction publishes a snapshot on a `watch` channel
//!
//! ## Example
//!
//! ```ignore
//! use safeguard_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field.clone()).await;
//! ```

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RuntimeError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a terminal action or state
        ///
        /// Returned by `send_and_wait_for` and `wait_for_state` when the
        /// timeout expires first.
        #[error("Timeout waiting for store")]
        Timeout,

        /// Action broadcast or state channel closed
        #[error("Store channel closed")]
        ChannelClosed,
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use crate::error::RuntimeError;
    use safeguard_core::{effect::Effect, reducer::Reducer};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{RwLock, broadcast, watch};

    /// Default capacity of the action broadcast channel
    pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

    /// Decrements the pending-effect counter when a spawned effect finishes,
    /// including when it panics.
    struct PendingGuard(Arc<AtomicUsize>);

    impl Drop for PendingGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store:
    /// 1. Holds the current state (behind a `RwLock`)
    /// 2. Runs the reducer for every action, one action at a time
    /// 3. Publishes a state snapshot after every reduction
    /// 4. Executes the returned effects and feeds their actions back in
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, broadcast after they have been reduced.
        action_broadcast: broadcast::Sender<A>,
        /// Latest state, republished after every reduction.
        state_publisher: Arc<watch::Sender<S>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast capacity defaults to
        /// [`DEFAULT_BROADCAST_CAPACITY`]; use [`Store::with_broadcast_capacity`]
        /// when many concurrent waiters are expected.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));
            let (state_publisher, _) = watch::channel(initial_state.clone());

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                state_publisher: Arc::new(state_publisher),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Publishes the new state snapshot
        /// 4. Starts the returned effects (does not wait for them)
        ///
        /// # Errors
        ///
        /// Returns [`RuntimeError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), RuntimeError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(RuntimeError::ShutdownInProgress);
            }

            self.apply(action).await;
            Ok(())
        }

        /// Reduce an action and start its effects, regardless of shutdown
        ///
        /// Effect results go through here so in-flight work still lands in
        /// the state while a shutdown drains it.
        async fn apply(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            metrics::counter!("store.actions.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                let effects = self.reducer.reduce(&mut state, action, &self.environment);

                // Published under the write lock so snapshots arrive in reduction order
                self.state_publisher.send_replace(state.clone());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect);
            }
        }

        /// Send an action and wait for a matching result action
        ///
        /// Subscribes to the action broadcast BEFORE sending, so a fast effect
        /// cannot be missed. Because effect actions are reduced before they are
        /// broadcast, the state already reflects the matching action when this
        /// returns.
        ///
        /// # Errors
        ///
        /// - [`RuntimeError::Timeout`]: Timeout expired before matching action received
        /// - [`RuntimeError::ChannelClosed`]: Action broadcast channel closed
        /// - [`RuntimeError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, RuntimeError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // If the terminal action was dropped, the timeout catches it
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(RuntimeError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| RuntimeError::Timeout)?
        }

        /// Watch state snapshots
        ///
        /// The receiver starts at the latest published state and is notified
        /// after every reduction.
        #[must_use]
        pub fn watch_state(&self) -> watch::Receiver<S> {
            self.state_publisher.subscribe()
        }

        /// Wait until the published state satisfies `predicate`
        ///
        /// Checks the current snapshot first, so an already-satisfied
        /// predicate returns immediately.
        ///
        /// # Errors
        ///
        /// - [`RuntimeError::Timeout`]: predicate still false when the timeout expired
        /// - [`RuntimeError::ChannelClosed`]: the store was dropped
        pub async fn wait_for_state<F>(&self, predicate: F, timeout: Duration) -> Result<S, RuntimeError>
        where
            F: Fn(&S) -> bool,
        {
            let mut rx = self.state_publisher.subscribe();

            tokio::time::timeout(timeout, async {
                loop {
                    {
                        let current = rx.borrow_and_update();
                        if predicate(&current) {
                            return Ok(current.clone());
                        }
                    }
                    rx.changed().await.map_err(|_| RuntimeError::ChannelClosed)?;
                }
            })
            .await
            .map_err(|_| RuntimeError::Timeout)?
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let signed_in = store.state(|s| s.identity().is_some()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Number of effects currently running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Returns `true` once [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Waits for pending effects to complete (with timeout); their
        ///    result actions are still reduced
        ///
        /// # Errors
        ///
        /// Returns [`RuntimeError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), RuntimeError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(RuntimeError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Execute an effect
        ///
        /// - `None`: No-op
        /// - `Future`: Spawned; a resulting action is reduced (even during
        ///   shutdown), then broadcast to observers
        /// - `Parallel`: Each child executed independently
        ///
        /// Effect failures are the effect's own business: whatever it wants the
        /// reducer to know must be encoded in the action it returns.
        fn execute_effect(&self, effect: Effect<A>)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            // Reduce first, then broadcast: waiters see the updated state
                            store.apply(action.clone()).await;
                            let _ = store.action_broadcast.send(action);
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect);
                    }
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
                state_publisher: Arc::clone(&self.state_publisher),
            }
        }
    }
}

// Re-export for convenience
pub use error::RuntimeError;
pub use store::Store;
