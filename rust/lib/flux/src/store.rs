use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::topic::Pattern;
use crate::value::{State, StateValue, SubscriptionId};

/// Callback type for state change notifications.
pub type ChangeHandler = Arc<dyn Fn(&str, &StateValue) + Send + Sync>;

/// Per-path state store with pattern-matched subscriptions.
///
/// - `set(path, value)` stores a value and notifies matching subscribers.
/// - `get(path)` reads the current value (Arc clone).
/// - `scan(prefix)` lists all children under a prefix path.
/// - `subscribe(pattern, handler)` / `unsubscribe(id)`.
///
/// Subscribers run on the caller's task after the value is visible and
/// with no store lock held, so a handler may read or write the store.
pub struct StateStore {
    values: RwLock<BTreeMap<String, StateValue>>,
    handlers: RwLock<Vec<HandlerEntry>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    pattern: Pattern,
    handler: ChangeHandler,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Set a typed value at the given path and notify matching subscribers.
    pub fn set<T: Any + Send + Sync>(&self, path: &str, value: T) {
        self.set_value(path, StateValue::new(value));
    }

    /// Set a pre-built StateValue and notify matching subscribers.
    pub fn set_value(&self, path: &str, value: StateValue) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), value.clone());

        let matched: Vec<ChangeHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.pattern.matches(path))
            .map(|e| Arc::clone(&e.handler))
            .collect();
        for handler in matched {
            handler(path, &value);
        }
    }

    /// Write a typed state at its own path.
    pub fn set_state<T: State>(&self, value: T) {
        self.set(T::PATH, value);
    }

    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Read a typed state from its own path.
    pub fn get_state<T: State>(&self) -> Option<T> {
        self.get(T::PATH).and_then(|v| v.cloned::<T>())
    }

    /// Read and downcast in one step.
    pub fn get_as<T: Any + Clone>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|v| v.cloned::<T>())
    }

    /// Remove the value at a path. Does not notify subscribers.
    pub fn remove(&self, path: &str) -> Option<StateValue> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// All entries strictly below `prefix`, ordered by path.
    pub fn scan(&self, prefix: &str) -> Vec<(String, StateValue)> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let scan_prefix = format!("{}/", prefix);
        values
            .range(scan_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&scan_prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to changes on every path matching `pattern`.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HandlerEntry {
                id,
                pattern: Pattern::parse(pattern),
                handler: Arc::new(handler),
            });
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|e| e.id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct AppRoute(String);

    impl State for AppRoute {
        const PATH: &'static str = "app/route";
    }

    // ========================================================================
    // get / set / remove
    // ========================================================================

    #[test]
    fn set_and_get() {
        let store = StateStore::new();
        store.set("bell/unread", 5u64);
        assert_eq!(store.get_as::<u64>("bell/unread"), Some(5));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn set_overwrites_previous_value() {
        let store = StateStore::new();
        store.set("bell/unread", 5u64);
        store.set("bell/unread", 0u64);
        assert_eq!(store.get_as::<u64>("bell/unread"), Some(0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn typed_state_round_trip() {
        let store = StateStore::new();
        assert!(store.get_state::<AppRoute>().is_none());

        store.set_state(AppRoute("/dashboard".into()));
        assert_eq!(
            store.get_state::<AppRoute>(),
            Some(AppRoute("/dashboard".into()))
        );
        assert!(store.contains("app/route"));
    }

    #[test]
    fn remove_does_not_notify() {
        let store = StateStore::new();
        let calls = Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        store.subscribe("#", move |_, _| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        store.set("ui/toast", "x".to_string());
        assert!(store.remove("ui/toast").is_some());
        assert!(store.remove("ui/toast").is_none());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert!(store.is_empty());
    }

    // ========================================================================
    // scan
    // ========================================================================

    #[test]
    fn scan_returns_ordered_children_only() {
        let store = StateStore::new();
        store.set("bell", 0u8);
        store.set("bell/unread", 1u8);
        store.set("bell/feed", 2u8);
        store.set("bellhop/feed", 3u8);

        let paths: Vec<String> = store.scan("bell").into_iter().map(|(k, _)| k).collect();
        assert_eq!(paths, vec!["bell/feed", "bell/unread"]);
    }

    // ========================================================================
    // subscribe / unsubscribe
    // ========================================================================

    #[test]
    fn subscribers_filtered_by_pattern() {
        let store = StateStore::new();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let s = seen.clone();
        store.subscribe("+/unread", move |path, _| {
            s.lock().unwrap().push(path.to_string());
        });

        store.set("bell/unread", 1u64);
        store.set("inbox/unread", 2u64);
        store.set("bell/feed", 3u64);

        assert_eq!(*seen.lock().unwrap(), vec!["bell/unread", "inbox/unread"]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = StateStore::new();
        let calls = Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        let id = store.subscribe("app/route", move |_, _| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        store.set_state(AppRoute("/a".into()));
        store.unsubscribe(id);
        store.set_state(AppRoute("/b".into()));

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_sees_value_already_stored() {
        let store = Arc::new(StateStore::new());
        let inner = store.clone();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        store.subscribe("app/route", move |_, _| {
            *s.lock().unwrap() = inner.get_state::<AppRoute>();
        });

        store.set_state(AppRoute("/login".into()));
        assert_eq!(*seen.lock().unwrap(), Some(AppRoute("/login".into())));
    }

    #[test]
    fn subscriber_may_write_back_into_store() {
        let store = Arc::new(StateStore::new());
        let inner = store.clone();
        store.subscribe("bell/unread", move |_, value| {
            let n = value.cloned::<u64>().unwrap_or(0);
            inner.set("bell/badge", format!("{n}"));
        });

        store.set("bell/unread", 7u64);
        assert_eq!(store.get_as::<String>("bell/badge"), Some("7".to_string()));
    }

    #[test]
    fn subscription_ids_are_unique() {
        let store = StateStore::new();
        let a = store.subscribe("a", |_, _| {});
        let b = store.subscribe("a", |_, _| {});
        assert_ne!(a, b);
        store.unsubscribe(SubscriptionId(999));
        assert_eq!(store.subscriber_count(), 2);
    }

    #[test]
    fn concurrent_writers() {
        use std::thread;

        let store = Arc::new(StateStore::new());
        let total = Arc::new(AtomicU64::new(0));
        let t = total.clone();
        store.subscribe("#", move |_, _| {
            t.fetch_add(1, Ordering::Relaxed);
        });

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..50u32 {
                        store.set(&format!("thread/{n}/{i}"), i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 200);
        assert_eq!(total.load(Ordering::Relaxed), 200);
    }
}
