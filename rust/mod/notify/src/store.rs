//! Notification cache.
//!
//! The cache is a single-page window plus the unread count. `fetch_page`
//! replaces the window wholesale; the count is fetched separately because
//! the window only holds a subset of the feed. Mutations never touch the
//! cache directly: they call the server, then re-fetch the page and then
//! the count, in that order.
//!
//! Everything is published through the owning surface's [`Scope`], so a
//! response that lands after unmount changes nothing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use escrow_client::{ApiError, Backend, Id, Notification, PageMeta};
use escrow_flux::Scope;
use tracing::{debug, info, warn};

use crate::error::{Mutation, NotifyError, FETCH_FAILED};
use crate::toast::{Toast, ToastKind};

/// The cached page, as the view renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    /// Server order, newest first.
    pub items: Vec<Notification>,
    pub meta: PageMeta,
    /// A fetch has completed, successfully or not. Until then the view
    /// shows a loading state rather than "no notifications".
    pub loaded: bool,
    pub loading: bool,
    /// Last fetch error, cleared by the next successful fetch.
    pub error: Option<String>,
}

impl FeedView {
    pub fn empty(per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            meta: PageMeta::empty(per_page),
            loaded: false,
            loading: false,
            error: None,
        }
    }

    pub fn get(&self, id: &Id) -> Option<&Notification> {
        self.items.iter().find(|n| &n.id == id)
    }

    /// Unread markers on this page. Not the unread count.
    pub fn unread_on_page(&self) -> usize {
        self.items.iter().filter(|n| n.is_unread()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadBadge {
    pub count: u64,
}

impl UnreadBadge {
    /// Badge text; hidden at zero.
    pub fn label(&self) -> Option<String> {
        match self.count {
            0 => None,
            n if n > 99 => Some("99+".to_string()),
            n => Some(n.to_string()),
        }
    }
}

struct Cache {
    feed: FeedView,
    unread: Option<u64>,
    /// Ids seen with `read_at` set during this session.
    seen_read: HashMap<Id, DateTime<Utc>>,
}

pub struct NotificationStore {
    backend: Arc<dyn Backend>,
    scope: Scope,
    prefix: String,
    page_size: u32,
    cache: Mutex<Cache>,
}

impl NotificationStore {
    /// A store publishing under `{prefix}/feed` and `{prefix}/unread`.
    pub fn new(backend: Arc<dyn Backend>, scope: Scope, prefix: &str, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            backend,
            scope,
            prefix: prefix.trim_end_matches('/').to_string(),
            page_size,
            cache: Mutex::new(Cache {
                feed: FeedView::empty(page_size),
                unread: None,
                seen_read: HashMap::new(),
            }),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn feed_path(&self) -> String {
        format!("{}/feed", self.prefix)
    }

    pub fn unread_path(&self) -> String {
        format!("{}/unread", self.prefix)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn feed(&self) -> FeedView {
        self.cache().feed.clone()
    }

    /// Last fetched unread count, `None` before the first fetch.
    pub fn unread_count(&self) -> Option<u64> {
        self.cache().unread
    }

    pub fn current_page(&self) -> u32 {
        self.cache().feed.meta.current_page.max(1)
    }

    // ====================================================================
    // Reads
    // ====================================================================

    /// Fetch `page` and replace the cached window with it.
    ///
    /// On failure the previous window stays (empty on first load) and a
    /// transient toast is posted.
    pub async fn fetch_page(&self, page: u32) -> Result<(), NotifyError> {
        let page = page.max(1);
        self.publish_feed(|feed| feed.loading = true);

        let result = self.backend.notifications(page, self.page_size).await;
        if !self.scope.is_mounted() {
            debug!(prefix = %self.prefix, page, "dropping page fetched after unmount");
            return Ok(());
        }

        match result {
            Ok(fetched) => {
                debug!(
                    prefix = %self.prefix,
                    page,
                    items = fetched.data.len(),
                    total = fetched.meta.total,
                    "page fetched"
                );
                self.note_read_state(&fetched.data);
                self.publish_feed(|feed| {
                    *feed = FeedView {
                        items: fetched.data,
                        meta: fetched.meta,
                        loaded: true,
                        loading: false,
                        error: None,
                    };
                });
                Ok(())
            }
            Err(e) => {
                warn!(prefix = %self.prefix, page, error = %e, "page fetch failed");
                self.publish_feed(|feed| {
                    feed.loaded = true;
                    feed.loading = false;
                    feed.error = Some(FETCH_FAILED.to_string());
                });
                self.toast(ToastKind::Transient, FETCH_FAILED);
                Err(NotifyError::Fetch(e))
            }
        }
    }

    /// Fetch the unread count.
    pub async fn fetch_unread_count(&self) -> Result<u64, NotifyError> {
        let result = self.backend.unread_count().await;
        if !self.scope.is_mounted() {
            debug!(prefix = %self.prefix, "dropping unread count fetched after unmount");
            return result.map_err(NotifyError::Fetch);
        }
        match result {
            Ok(count) => {
                self.cache().unread = Some(count);
                self.scope.set(&self.unread_path(), UnreadBadge { count });
                Ok(count)
            }
            Err(e) => {
                warn!(prefix = %self.prefix, error = %e, "unread count fetch failed");
                self.toast(ToastKind::Transient, FETCH_FAILED);
                Err(NotifyError::Fetch(e))
            }
        }
    }

    // ====================================================================
    // Mutations
    // ====================================================================

    pub async fn mark_read(&self, id: &Id) -> Result<(), NotifyError> {
        self.mutate(Mutation::MarkRead, self.backend.mark_read(id)).await
    }

    pub async fn mark_all_read(&self) -> Result<(), NotifyError> {
        self.mutate(Mutation::MarkAllRead, self.backend.mark_all_read())
            .await
    }

    pub async fn delete(&self, id: &Id) -> Result<(), NotifyError> {
        self.mutate(Mutation::Delete, self.backend.delete_notification(id))
            .await
    }

    async fn mutate<F>(&self, action: Mutation, call: F) -> Result<(), NotifyError>
    where
        F: Future<Output = Result<(), ApiError>>,
    {
        match call.await {
            Ok(()) => info!(prefix = %self.prefix, %action, "applied"),
            Err(e) if e.is_not_found() => {
                debug!(prefix = %self.prefix, %action, "target already gone, treating as applied");
            }
            Err(e) => {
                warn!(prefix = %self.prefix, %action, error = %e, "mutation failed");
                self.toast(ToastKind::Failure, action.failure_message());
                return Err(NotifyError::Mutation { action, source: e });
            }
        }
        self.reconcile().await;
        Ok(())
    }

    /// Re-fetch the current page, then the count.
    ///
    /// If the current page no longer exists (its last item was deleted), the
    /// new last page is shown instead. Fetch failures are already reported
    /// by the fetches themselves.
    async fn reconcile(&self) {
        let page = self.current_page();
        if self.fetch_page(page).await.is_ok() {
            let (empty, last) = {
                let cache = self.cache();
                (cache.feed.items.is_empty(), cache.feed.meta.last_page)
            };
            if empty && page > 1 && last < page {
                debug!(prefix = %self.prefix, page, last, "current page vanished, stepping back");
                let _ = self.fetch_page(last).await;
            }
        }
        let _ = self.fetch_unread_count().await;
    }

    // ====================================================================
    // Publishing
    // ====================================================================

    /// Apply `f` to the cached feed and publish the result. The cache lock
    /// is released before subscribers run.
    fn publish_feed(&self, f: impl FnOnce(&mut FeedView)) {
        if !self.scope.is_mounted() {
            return;
        }
        let snapshot = {
            let mut cache = self.cache();
            f(&mut cache.feed);
            cache.feed.clone()
        };
        self.scope.set(&self.feed_path(), snapshot);
    }

    fn toast(&self, kind: ToastKind, message: &str) {
        self.scope.set_state(Toast::new(kind, message));
    }

    /// Track `read_at` across fetches. A read item coming back unread is a
    /// server anomaly: it is logged and the server's value is shown as is.
    fn note_read_state(&self, items: &[Notification]) {
        let mut cache = self.cache();
        for n in items {
            match n.read_at {
                Some(at) => {
                    cache.seen_read.entry(n.id.clone()).or_insert(at);
                }
                None => {
                    if let Some(at) = cache.seen_read.get(&n.id) {
                        warn!(
                            prefix = %self.prefix,
                            id = %n.id,
                            read_at = %at,
                            "server returned a read notification as unread"
                        );
                    }
                }
            }
        }
    }
}
