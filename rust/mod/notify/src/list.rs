use std::sync::Arc;

use escrow_client::{Backend, Id};
use escrow_flux::{Scope, StateStore};
use tracing::debug;

use crate::config::SurfaceConfig;
use crate::error::NotifyError;
use crate::store::{FeedView, NotificationStore};

/// State prefix for the list page's feed and count.
pub const PREFIX: &str = "notifications";

/// The full notifications page. No polling and no outside-click handling;
/// it refreshes on mount and after each action. Dropping it unmounts.
pub struct NotificationList {
    store: NotificationStore,
}

impl NotificationList {
    /// Mount the page and load the first page and the unread count.
    ///
    /// Load failures are already on screen as a toast and an empty list, so
    /// the page mounts regardless.
    pub async fn mount(
        backend: Arc<dyn Backend>,
        state: Arc<StateStore>,
        config: &SurfaceConfig,
    ) -> Self {
        let scope = Scope::new(state);
        let list = Self {
            store: NotificationStore::new(backend, scope, PREFIX, config.list_page_size),
        };
        let _ = list.store.fetch_page(1).await;
        let _ = list.store.fetch_unread_count().await;
        list
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn feed(&self) -> FeedView {
        self.store.feed()
    }

    pub fn unread_count(&self) -> Option<u64> {
        self.store.unread_count()
    }

    pub fn page(&self) -> u32 {
        self.store.current_page()
    }

    /// Go to `page`, clamped to the pages the server last reported.
    pub async fn goto_page(&self, page: u32) -> Result<(), NotifyError> {
        let last = self.store.feed().meta.last_page.max(1);
        self.store.fetch_page(page.clamp(1, last)).await
    }

    /// Returns whether there was a next page to go to.
    pub async fn next_page(&self) -> Result<bool, NotifyError> {
        let meta = self.store.feed().meta;
        if !meta.has_next() {
            return Ok(false);
        }
        self.store.fetch_page(meta.current_page + 1).await?;
        Ok(true)
    }

    /// Returns whether there was a previous page to go to.
    pub async fn prev_page(&self) -> Result<bool, NotifyError> {
        let meta = self.store.feed().meta;
        if !meta.has_prev() {
            return Ok(false);
        }
        self.store.fetch_page(meta.current_page - 1).await?;
        Ok(true)
    }

    pub async fn mark_read(&self, id: &Id) -> Result<(), NotifyError> {
        self.store.mark_read(id).await
    }

    pub async fn delete(&self, id: &Id) -> Result<(), NotifyError> {
        self.store.delete(id).await
    }

    /// "Mark all read" is offered only while something is unread.
    pub fn can_mark_all_read(&self) -> bool {
        self.store.unread_count().unwrap_or(0) > 0
    }

    pub async fn mark_all_read(&self) -> Result<(), NotifyError> {
        if !self.can_mark_all_read() {
            debug!("nothing unread, mark-all-read skipped");
            return Ok(());
        }
        self.store.mark_all_read().await
    }

    pub fn unmount(&self) {
        self.store.scope().unmount();
    }
}

impl Drop for NotificationList {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrow_client::mock::{user, Endpoint, MockBackend};
    use escrow_client::{MemoryTokenStore, Role};

    use crate::toast::{Toast, ToastKind};

    fn backend(total: usize, unread: usize) -> Arc<MockBackend> {
        let tokens = Arc::new(MemoryTokenStore::default());
        let backend = Arc::new(MockBackend::new(tokens));
        backend.sign_in(user(1, "Ada", Role::Company));
        backend.seed_notifications(total, unread);
        backend
    }

    async fn mount(backend: &Arc<MockBackend>) -> (Arc<StateStore>, NotificationList) {
        let flux = Arc::new(StateStore::new());
        let list =
            NotificationList::mount(backend.clone(), flux.clone(), &SurfaceConfig::default()).await;
        (flux, list)
    }

    // =====================================================================
    // Pagination
    // =====================================================================

    #[tokio::test]
    async fn mount_loads_first_page_and_count() {
        let backend = backend(45, 7);
        let (flux, list) = mount(&backend).await;

        assert_eq!(list.feed().items.len(), 20);
        assert_eq!(list.feed().meta.last_page, 3);
        assert_eq!(list.unread_count(), Some(7));
        assert!(flux.contains("notifications/feed"));
        assert!(flux.contains("notifications/unread"));
    }

    #[tokio::test]
    async fn next_and_prev_stop_at_the_ends() {
        let backend = backend(45, 0);
        let (_, list) = mount(&backend).await;

        assert!(!list.prev_page().await.unwrap());
        assert!(list.next_page().await.unwrap());
        assert!(list.next_page().await.unwrap());
        assert_eq!(list.page(), 3);
        assert_eq!(list.feed().items.len(), 5);
        assert!(!list.next_page().await.unwrap());
        assert!(list.prev_page().await.unwrap());
        assert_eq!(list.page(), 2);
    }

    #[tokio::test]
    async fn goto_page_clamps() {
        let backend = backend(45, 0);
        let (_, list) = mount(&backend).await;

        list.goto_page(99).await.unwrap();
        assert_eq!(list.page(), 3);
        list.goto_page(0).await.unwrap();
        assert_eq!(list.page(), 1);
    }

    #[tokio::test]
    async fn mount_survives_load_failure() {
        let backend = backend(5, 1);
        backend.fail(Endpoint::Notifications, 502, 1);
        let (flux, list) = mount(&backend).await;

        assert!(list.feed().loaded);
        assert!(list.feed().items.is_empty());
        assert_eq!(list.unread_count(), Some(1));
        assert_eq!(flux.get_state::<Toast>().unwrap().kind, ToastKind::Transient);
    }

    // =====================================================================
    // Actions
    // =====================================================================

    #[tokio::test]
    async fn mark_all_read_gated_on_count() {
        let backend = backend(5, 0);
        let (_, list) = mount(&backend).await;
        backend.clear_calls();

        assert!(!list.can_mark_all_read());
        list.mark_all_read().await.unwrap();
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn mark_all_read_clears_everything() {
        let backend = backend(30, 25);
        let (_, list) = mount(&backend).await;
        assert!(list.can_mark_all_read());

        list.mark_all_read().await.unwrap();
        assert_eq!(list.unread_count(), Some(0));
        assert_eq!(list.feed().unread_on_page(), 0);
        assert!(!list.can_mark_all_read());
        assert_eq!(backend.server_unread(), 0);
    }

    #[tokio::test]
    async fn per_item_actions_reconcile_current_page() {
        let backend = backend(45, 45);
        let (_, list) = mount(&backend).await;
        list.goto_page(2).await.unwrap();

        list.mark_read(&Id::from("n21")).await.unwrap();
        assert_eq!(list.page(), 2);
        assert!(!list.feed().get(&Id::from("n21")).unwrap().is_unread());
        assert_eq!(list.unread_count(), Some(44));

        list.delete(&Id::from("n22")).await.unwrap();
        assert_eq!(list.page(), 2);
        assert!(list.feed().get(&Id::from("n22")).is_none());
        assert_eq!(list.feed().meta.total, 44);
    }

    #[tokio::test]
    async fn results_after_unmount_are_dropped() {
        let backend = backend(5, 5);
        let (flux, list) = mount(&backend).await;
        list.unmount();

        let before = flux.get_as::<FeedView>("notifications/feed");
        list.mark_read(&Id::from("n1")).await.unwrap();
        assert_eq!(flux.get_as::<FeedView>("notifications/feed"), before);
        assert_eq!(list.unread_count(), Some(5));
    }
}
