use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A published piece of view state.
///
/// Values are immutable once stored; a new `set` replaces the `Arc`, so a
/// subscriber holding an older `StateValue` keeps seeing the snapshot it
/// was handed.
#[derive(Clone)]
pub struct StateValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl StateValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Owned copy of the value if it is a `T`.
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Both handles point at the same snapshot.
    pub fn same(&self, other: &StateValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateValue<{}>", self.type_name)
    }
}

/// A state type that lives at a fixed path.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// pub struct AppRoute(pub String);
///
/// impl State for AppRoute {
///     const PATH: &'static str = "app/route";
/// }
/// ```
pub trait State: Any + Send + Sync + Clone {
    const PATH: &'static str;
}

/// Returned by `StateStore::subscribe`; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
