use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use crate::store::StateStore;
use crate::topic::Pattern;

/// A boxed, `Send`-able future returned by request handlers.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Type-erased payload carried by a request.
pub type Payload = Arc<dyn Any + Send + Sync>;

type ErasedHandler = Arc<dyn Fn(String, Payload, Arc<StateStore>) -> BoxFuture + Send + Sync>;

/// A request type addressed by a fixed path.
///
/// ```ignore
/// pub struct MarkReadReq { pub id: Id }
///
/// impl Request for MarkReadReq {
///     const PATH: &'static str = "bell/mark-read";
/// }
/// ```
pub trait Request: Any + Send + Sync {
    const PATH: &'static str;
}

/// Request router: maps path patterns to async handlers.
///
/// Several handlers may match one path; they run sequentially in
/// registration order. Dispatching a path with no handler is a no-op.
pub struct Router {
    routes: RwLock<Vec<(Pattern, ErasedHandler)>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
        }
    }

    /// Register an async handler for a path pattern.
    pub fn on<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(String, Payload, Arc<StateStore>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: ErasedHandler = Arc::new(
            move |path: String, payload: Payload, store: Arc<StateStore>| -> BoxFuture {
                Box::pin(handler(path, payload, store))
            },
        );
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Pattern::parse(pattern), handler));
    }

    /// Dispatch a request to all matching handlers.
    pub async fn dispatch(&self, path: &str, payload: Payload, store: Arc<StateStore>) {
        let handlers: Vec<ErasedHandler> = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(p, _)| p.matches(path))
            .map(|(_, h)| Arc::clone(h))
            .collect();
        if handlers.is_empty() {
            tracing::debug!(path, "no handler for request");
        }
        for handler in handlers {
            handler(path.to_string(), Arc::clone(&payload), Arc::clone(&store)).await;
        }
    }

    /// Check if any handler would match the given path.
    pub fn matches(&self, path: &str) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(p, _)| p.matches(path))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
