use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use crate::router::{Payload, Request, Router};
use crate::scope::Scope;
use crate::store::StateStore;
use crate::value::{State, StateValue, SubscriptionId};

/// Flux: the client state engine.
///
/// ```ignore
/// let flux = Flux::new();
///
/// flux.on(MarkAllReadReq::PATH, move |_, _, _| {
///     let list = list.clone();
///     async move { let _ = list.mark_all_read().await; }
/// });
///
/// flux.subscribe("inbox/#", |path, _| println!("{path} changed"));
/// flux.emit_request(MarkAllReadReq).await;
/// ```
pub struct Flux {
    store: Arc<StateStore>,
    router: Router,
}

impl Flux {
    pub fn new() -> Self {
        Self {
            store: Arc::new(StateStore::new()),
            router: Router::new(),
        }
    }

    // ====================================================================
    // State
    // ====================================================================

    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.store.get(path)
    }

    pub fn get_state<T: State>(&self) -> Option<T> {
        self.store.get_state::<T>()
    }

    pub fn scan(&self, prefix: &str) -> Vec<(String, StateValue)> {
        self.store.scan(prefix)
    }

    // ====================================================================
    // Requests
    // ====================================================================

    /// Emit a request and wait for every matching handler to finish.
    pub async fn emit<T: Any + Send + Sync>(&self, path: &str, payload: T) {
        self.router
            .dispatch(path, Arc::new(payload), Arc::clone(&self.store))
            .await;
    }

    /// Emit a typed request at its own path.
    pub async fn emit_request<R: Request>(&self, request: R) {
        self.emit(R::PATH, request).await;
    }

    pub fn on<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(String, Payload, Arc<StateStore>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.router.on(pattern, handler);
    }

    pub fn has_handler(&self, path: &str) -> bool {
        self.router.matches(path)
    }

    // ====================================================================
    // Subscriptions
    // ====================================================================

    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        self.store.subscribe(pattern, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id);
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    /// Open a mount scope for a component that writes into this store.
    pub fn scope(&self) -> Scope {
        Scope::new(Arc::clone(&self.store))
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

impl Default for Flux {
    fn default() -> Self {
        Self::new()
    }
}
