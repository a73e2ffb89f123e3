//! Scoped event listeners.
//!
//! An `EventHub` stands in for a document-level event target. `listen`
//! returns a [`Listener`] handle; the registration lives exactly as long as
//! the handle, so a component that stores the handle only while it needs
//! events cannot leak a listener past close or unmount.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    entries: Mutex<Vec<(u64, Callback<E>)>>,
    next_id: AtomicU64,
}

impl<E> Registry<E> {
    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(entry_id, _)| *entry_id != id);
    }
}

pub struct EventHub<E> {
    registry: Arc<Registry<E>>,
}

impl<E: 'static> EventHub<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a callback. It stays attached until the handle is dropped.
    #[must_use = "the listener detaches as soon as the handle is dropped"]
    pub fn listen<F>(&self, callback: F) -> Listener<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        Listener {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every listener attached at call time.
    ///
    /// Callbacks run without the registry lock held, so a callback may
    /// drop its own handle.
    pub fn dispatch(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .registry
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E: 'static> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration handle returned by [`EventHub::listen`].
pub struct Listener<E> {
    id: u64,
    registry: Weak<Registry<E>>,
}

impl<E> Drop for Listener<E> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct PointerDown {
        x: f64,
    }

    #[test]
    fn listener_receives_events_until_dropped() {
        let hub = EventHub::<PointerDown>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let listener = hub.listen(move |e: &PointerDown| s.lock().unwrap().push(e.x));

        hub.dispatch(&PointerDown { x: 1.0 });
        assert_eq!(hub.listener_count(), 1);

        drop(listener);
        hub.dispatch(&PointerDown { x: 2.0 });

        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn callback_may_drop_its_own_handle() {
        let hub = EventHub::<PointerDown>::new();
        let slot: Arc<Mutex<Option<Listener<PointerDown>>>> = Arc::new(Mutex::new(None));
        let s = slot.clone();
        let listener = hub.listen(move |_| {
            s.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(listener);

        hub.dispatch(&PointerDown { x: 0.0 });
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn handle_outliving_hub_is_harmless() {
        let hub = EventHub::<PointerDown>::new();
        let listener = hub.listen(|_| {});
        drop(hub);
        drop(listener);
    }
}
