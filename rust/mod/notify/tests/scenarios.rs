//! End-to-end scenarios: a guarded dashboard with the notification bell.
//!
//! The guard resolves the session and the bell is mounted only inside the
//! rendered subtree, the same way a view would wire them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use escrow_client::mock::{notification, user, Endpoint, MockBackend};
use escrow_client::{Backend, Id, MemoryTokenStore, Role, TokenStore};
use escrow_flux::{EventHub, StateStore};
use escrow_notify::{BellDropdown, PointerDown, SurfaceConfig, UnreadBadge};
use escrow_session::{
    AppRoute, FluxNavigator, GuardKind, GuardPhase, RenderContext, RouteGuard, SessionResolver,
    SIGN_IN,
};

struct App {
    flux: Arc<StateStore>,
    tokens: Arc<MemoryTokenStore>,
    backend: Arc<MockBackend>,
    navigator: Arc<FluxNavigator>,
    document: Arc<EventHub<PointerDown>>,
}

impl App {
    fn new() -> Self {
        let flux = Arc::new(StateStore::new());
        let tokens = Arc::new(MemoryTokenStore::default());
        Self {
            backend: Arc::new(MockBackend::new(tokens.clone())),
            navigator: Arc::new(FluxNavigator::new(flux.clone())),
            document: Arc::new(EventHub::new()),
            flux,
            tokens,
        }
    }

    fn guard(&self, kind: GuardKind) -> RouteGuard {
        let resolver = SessionResolver::new(self.tokens.clone(), self.backend.clone());
        RouteGuard::new(kind, resolver, self.navigator.clone(), self.flux.clone())
    }

    fn bell(&self) -> BellDropdown {
        BellDropdown::mount(
            self.backend.clone(),
            self.navigator.clone(),
            self.document.clone(),
            self.flux.clone(),
            &SurfaceConfig::default(),
        )
    }
}

#[tokio::test(start_paused = true)]
async fn admin_dashboard_shows_back_office_and_bell() {
    let app = App::new();
    app.backend.sign_in(user(1, "Root", Role::Admin));
    app.backend.seed_notifications(4, 2);

    let rendered: Arc<Mutex<Option<RenderContext>>> = Arc::default();
    let slot = rendered.clone();
    let mut mount = app
        .guard(GuardKind::Protected)
        .mount(move |ctx| *slot.lock().unwrap() = Some(ctx));
    let phase = mount.settled().await.unwrap();
    assert!(matches!(phase, GuardPhase::Authorized(_)));

    let ctx = rendered.lock().unwrap().clone().unwrap();
    let labels: Vec<_> = ctx.nav.iter().map(|i| i.label).collect();
    for label in ["Companies", "Escrow", "Disputes", "Platform Settings"] {
        assert!(labels.contains(&label));
    }

    let bell = app.bell();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(
        app.flux.get_as::<UnreadBadge>("bell/unread"),
        Some(UnreadBadge { count: 2 })
    );
    drop(bell);
}

#[tokio::test]
async fn expired_session_redirects_without_rendering() {
    let app = App::new();
    app.tokens.set("expired-token").unwrap();

    let rendered = Arc::new(Mutex::new(0usize));
    let count = rendered.clone();
    let mut mount = app
        .guard(GuardKind::Protected)
        .mount(move |_| *count.lock().unwrap() += 1);

    assert_eq!(
        mount.settled().await,
        Some(GuardPhase::Redirecting(SIGN_IN.into()))
    );
    assert_eq!(*rendered.lock().unwrap(), 0);
    assert_eq!(app.flux.get_state::<AppRoute>(), Some(AppRoute(SIGN_IN.into())));
    assert_eq!(app.tokens.get(), None);
}

#[tokio::test(start_paused = true)]
async fn poll_and_click_race_both_settle() {
    let app = App::new();
    app.backend.sign_in(user(2, "Cy", Role::Client));
    app.backend
        .set_notifications(vec![notification("a", 1, true, 0), notification("b", 2, true, 1)]);

    let bell = app.bell();
    bell.open().await.unwrap();

    // A click and a poll tick in flight together; either order is valid.
    let id = Id::from("a");
    let click = bell.click(&id);
    let tick = async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    };
    let (clicked, ()) = tokio::join!(click, tick);
    clicked.unwrap();

    // The next natural trigger brings both signals into agreement.
    tokio::time::sleep(Duration::from_secs(30)).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(bell.unread_count(), Some(1));
    assert_eq!(app.backend.unread_count().await.unwrap(), 1);
    assert!(app.backend.count(Endpoint::MarkRead) >= 1);
    assert_eq!(
        app.flux.get_state::<AppRoute>(),
        Some(AppRoute("/projects/1".into()))
    );
}
