//! Bell dropdown.
//!
//! One ticker drives polling: every tick fetches the unread count, and also
//! the first page if the dropdown is open when the tick fires. The
//! document-level pointer listener exists only while the dropdown is open.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use escrow_client::{Backend, Id};
use escrow_flux::{EventHub, Listener, Scope, State, StateStore, Ticker};
use escrow_session::Navigator;
use tracing::debug;

use crate::config::SurfaceConfig;
use crate::error::NotifyError;
use crate::store::{FeedView, NotificationStore};

/// State prefix for the bell's feed and badge.
pub const PREFIX: &str = "bell";

/// A pointer-down anywhere in the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDown {
    pub x: f64,
    pub y: f64,
}

/// The dropdown's bounding box in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn contains(&self, p: &PointerDown) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Whether the dropdown is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BellOpen(pub bool);

impl State for BellOpen {
    const PATH: &'static str = "bell/open";
}

struct Ui {
    open: bool,
    bounds: Bounds,
    outside_click: Option<Listener<PointerDown>>,
}

struct Inner {
    store: NotificationStore,
    navigator: Arc<dyn Navigator>,
    document: Arc<EventHub<PointerDown>>,
    ui: Mutex<Ui>,
}

impl Inner {
    fn ui(&self) -> MutexGuard<'_, Ui> {
        self.ui.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_open(&self) -> bool {
        self.ui().open
    }

    /// Flip to open and attach the outside-click listener. Returns false if
    /// already open or unmounted.
    fn set_open(self: &Arc<Self>) -> bool {
        if !self.store.scope().is_mounted() {
            return false;
        }
        let weak: Weak<Inner> = Arc::downgrade(self);
        let mut ui = self.ui();
        if ui.open {
            return false;
        }
        ui.open = true;
        ui.outside_click = Some(self.document.listen(move |p: &PointerDown| {
            if let Some(inner) = weak.upgrade() {
                if !inner.ui().bounds.contains(p) {
                    debug!(x = p.x, y = p.y, "pointer-down outside bell");
                    inner.close();
                }
            }
        }));
        drop(ui);
        self.store.scope().set_state(BellOpen(true));
        true
    }

    fn close(&self) {
        let listener = {
            let mut ui = self.ui();
            if !ui.open {
                return;
            }
            ui.open = false;
            ui.outside_click.take()
        };
        drop(listener);
        self.store.scope().set_state(BellOpen(false));
    }

    async fn tick(&self) {
        let open = self.is_open();
        let _ = self.store.fetch_unread_count().await;
        if open {
            let _ = self.store.fetch_page(1).await;
        }
    }
}

/// The notification bell. Dropping it unmounts.
pub struct BellDropdown {
    inner: Arc<Inner>,
    ticker: Ticker,
}

impl BellDropdown {
    /// Mount the bell and start polling. Must be called inside a tokio
    /// runtime.
    pub fn mount(
        backend: Arc<dyn Backend>,
        navigator: Arc<dyn Navigator>,
        document: Arc<EventHub<PointerDown>>,
        state: Arc<StateStore>,
        config: &SurfaceConfig,
    ) -> Self {
        let scope = Scope::new(state);
        scope.set_state(BellOpen(false));
        let inner = Arc::new(Inner {
            store: NotificationStore::new(backend, scope.clone(), PREFIX, config.bell_page_size),
            navigator,
            document,
            ui: Mutex::new(Ui {
                open: false,
                bounds: Bounds::default(),
                outside_click: None,
            }),
        });

        let weak = Arc::downgrade(&inner);
        let ticker = Ticker::start(&scope, "notification-poll", config.poll_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.tick().await;
                }
            }
        });
        Self { inner, ticker }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.inner.store
    }

    pub fn feed(&self) -> FeedView {
        self.inner.store.feed()
    }

    pub fn unread_count(&self) -> Option<u64> {
        self.inner.store.unread_count()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn is_polling(&self) -> bool {
        self.ticker.is_running()
    }

    /// Update the dropdown's bounds, as laid out by the view.
    pub fn set_bounds(&self, bounds: Bounds) {
        self.inner.ui().bounds = bounds;
    }

    /// Open and fetch the first page.
    pub async fn open(&self) -> Result<(), NotifyError> {
        if !self.inner.set_open() {
            return Ok(());
        }
        self.inner.store.fetch_page(1).await
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub async fn toggle(&self) -> Result<(), NotifyError> {
        if self.is_open() {
            self.close();
            Ok(())
        } else {
            self.open().await
        }
    }

    /// Follow a notification: navigate to its target, mark it read if it
    /// is unread, then close.
    pub async fn click(&self, id: &Id) -> Result<(), NotifyError> {
        let item = self.inner.store.feed().get(id).cloned();
        let result = match item {
            Some(n) => {
                if let Some(target) = n.target() {
                    self.inner.navigator.navigate(target.as_str());
                }
                if n.is_unread() {
                    self.inner.store.mark_read(id).await
                } else {
                    Ok(())
                }
            }
            None => {
                debug!(%id, "clicked notification is no longer on the page");
                Ok(())
            }
        };
        self.close();
        result
    }

    pub async fn mark_all_read(&self) -> Result<(), NotifyError> {
        self.inner.store.mark_all_read().await
    }

    /// Close, stop polling and drop all further results.
    pub fn unmount(&self) {
        self.inner.close();
        self.inner.store.scope().unmount();
    }
}

impl Drop for BellDropdown {
    fn drop(&mut self) {
        self.unmount();
    }
}
