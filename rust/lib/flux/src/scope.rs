//! Mount scopes.
//!
//! A `Scope` is the lifetime of one mounted component. Everything that
//! component does asynchronously goes through its scope:
//!
//! - `set` / `set_state` write to the store only while mounted
//! - `spawn` runs a task that stops at unmount
//! - `cancelled()` resolves at unmount, for `select!` loops
//!
//! Requests in flight at unmount are not aborted; their results are simply
//! refused by `set`, so no state changes after the component is gone.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::store::StateStore;
use crate::value::State;

#[derive(Clone)]
pub struct Scope {
    store: Arc<StateStore>,
    token: CancellationToken,
}

impl Scope {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            token: CancellationToken::new(),
        }
    }

    /// A nested scope that unmounts with its parent, or on its own.
    pub fn child(&self) -> Scope {
        Scope {
            store: Arc::clone(&self.store),
            token: self.token.child_token(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Unmount. Idempotent.
    pub fn unmount(&self) {
        if self.is_mounted() {
            debug!("scope unmounted");
            self.token.cancel();
        }
    }

    /// Resolves once the scope is unmounted.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Write a value if still mounted. Returns whether the write happened.
    pub fn set<T: Any + Send + Sync>(&self, path: &str, value: T) -> bool {
        if !self.is_mounted() {
            debug!(path, "discarding write after unmount");
            return false;
        }
        self.store.set(path, value);
        true
    }

    pub fn set_state<T: State>(&self, value: T) -> bool {
        self.set(T::PATH, value)
    }

    /// Spawn a task bound to this scope.
    ///
    /// The task is dropped at its next suspension point after unmount and
    /// the handle then yields `None`.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => None,
                out = fut => Some(out),
            }
        })
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}
