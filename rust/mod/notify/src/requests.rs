//! Requests the view layer emits at the notification surfaces.

use std::sync::Arc;

use escrow_client::Id;
use escrow_flux::router::Payload;
use escrow_flux::{Flux, Request};
use tracing::debug;

use crate::bell::BellDropdown;
use crate::list::NotificationList;

pub struct BellToggleReq;

impl Request for BellToggleReq {
    const PATH: &'static str = "bell/toggle";
}

pub struct BellClickReq {
    pub id: Id,
}

impl Request for BellClickReq {
    const PATH: &'static str = "bell/click";
}

pub struct BellMarkAllReadReq;

impl Request for BellMarkAllReadReq {
    const PATH: &'static str = "bell/mark-all-read";
}

pub struct ListPageReq {
    pub page: u32,
}

impl Request for ListPageReq {
    const PATH: &'static str = "notifications/page";
}

pub struct MarkReadReq {
    pub id: Id,
}

impl Request for MarkReadReq {
    const PATH: &'static str = "notifications/mark-read";
}

pub struct DeleteReq {
    pub id: Id,
}

impl Request for DeleteReq {
    const PATH: &'static str = "notifications/delete";
}

pub struct MarkAllReadReq;

impl Request for MarkAllReadReq {
    const PATH: &'static str = "notifications/mark-all-read";
}

fn id_of<R: Request>(payload: &Payload, get: fn(&R) -> &Id) -> Option<Id> {
    let id = payload.downcast_ref::<R>().map(|r| get(r).clone());
    if id.is_none() {
        debug!(path = R::PATH, "request payload has the wrong type");
    }
    id
}

/// Route `bell/*` requests to a mounted bell. Failures are already shown as
/// toasts by the bell itself.
pub fn register_bell(flux: &Flux, bell: Arc<BellDropdown>) {
    let b = bell.clone();
    flux.on(BellToggleReq::PATH, move |_, _, _| {
        let bell = b.clone();
        async move {
            let _ = bell.toggle().await;
        }
    });

    let b = bell.clone();
    flux.on(BellClickReq::PATH, move |_, payload, _| {
        let bell = b.clone();
        let id = id_of::<BellClickReq>(&payload, |r| &r.id);
        async move {
            if let Some(id) = id {
                let _ = bell.click(&id).await;
            }
        }
    });

    flux.on(BellMarkAllReadReq::PATH, move |_, _, _| {
        let bell = bell.clone();
        async move {
            let _ = bell.mark_all_read().await;
        }
    });
}

/// Route `notifications/*` requests to a mounted list page.
pub fn register_list(flux: &Flux, list: Arc<NotificationList>) {
    let l = list.clone();
    flux.on(ListPageReq::PATH, move |_, payload, _| {
        let list = l.clone();
        let page = payload.downcast_ref::<ListPageReq>().map(|r| r.page);
        async move {
            if let Some(page) = page {
                let _ = list.goto_page(page).await;
            }
        }
    });

    let l = list.clone();
    flux.on(MarkReadReq::PATH, move |_, payload, _| {
        let list = l.clone();
        let id = id_of::<MarkReadReq>(&payload, |r| &r.id);
        async move {
            if let Some(id) = id {
                let _ = list.mark_read(&id).await;
            }
        }
    });

    let l = list.clone();
    flux.on(DeleteReq::PATH, move |_, payload, _| {
        let list = l.clone();
        let id = id_of::<DeleteReq>(&payload, |r| &r.id);
        async move {
            if let Some(id) = id {
                let _ = list.delete(&id).await;
            }
        }
    });

    flux.on(MarkAllReadReq::PATH, move |_, _, _| {
        let list = list.clone();
        async move {
            let _ = list.mark_all_read().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrow_client::mock::{notification, user, Endpoint, MockBackend};
    use escrow_client::{MemoryTokenStore, Role};
    use escrow_flux::EventHub;
    use escrow_session::FluxNavigator;

    use crate::bell::BellOpen;
    use crate::config::SurfaceConfig;

    fn backend() -> Arc<MockBackend> {
        let tokens = Arc::new(MemoryTokenStore::default());
        let backend = Arc::new(MockBackend::new(tokens));
        backend.sign_in(user(1, "Ada", Role::Client));
        backend
    }

    #[tokio::test(start_paused = true)]
    async fn bell_requests() {
        let backend = backend();
        backend.set_notifications(vec![notification("n1", 3, true, 0)]);
        let flux = Flux::new();
        let bell = Arc::new(BellDropdown::mount(
            backend.clone(),
            Arc::new(FluxNavigator::new(flux.store().clone())),
            Arc::new(EventHub::new()),
            flux.store().clone(),
            &SurfaceConfig::default(),
        ));
        register_bell(&flux, bell.clone());

        flux.emit_request(BellToggleReq).await;
        assert_eq!(flux.get_state::<BellOpen>(), Some(BellOpen(true)));

        flux.emit_request(BellClickReq { id: Id::from("n1") }).await;
        assert_eq!(flux.get_state::<BellOpen>(), Some(BellOpen(false)));
        assert_eq!(backend.count(Endpoint::MarkRead), 1);
    }

    #[tokio::test]
    async fn list_requests() {
        let backend = backend();
        backend.seed_notifications(30, 30);
        let flux = Flux::new();
        let list = Arc::new(
            NotificationList::mount(backend.clone(), flux.store().clone(), &SurfaceConfig::default())
                .await,
        );
        register_list(&flux, list.clone());
        assert!(flux.has_handler("notifications/mark-all-read"));

        flux.emit_request(ListPageReq { page: 2 }).await;
        assert_eq!(list.page(), 2);

        flux.emit_request(MarkReadReq { id: Id::from("n25") }).await;
        flux.emit_request(DeleteReq { id: Id::from("n26") }).await;
        assert_eq!(list.unread_count(), Some(28));

        flux.emit_request(MarkAllReadReq).await;
        assert_eq!(list.unread_count(), Some(0));

        // Wrong payload type at a known path is ignored.
        flux.emit(MarkReadReq::PATH, 42u8).await;
        assert_eq!(backend.count(Endpoint::MarkRead), 1);
    }
}
