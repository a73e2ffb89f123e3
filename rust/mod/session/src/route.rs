//! Client-side navigation.

use std::sync::Arc;

use escrow_flux::{State, StateStore};
use tracing::info;

/// Sign-in view.
pub const SIGN_IN: &str = "/login";

/// Landing view for an authenticated user.
pub const LANDING: &str = "/dashboard";

/// The current client-side route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoute(pub String);

impl State for AppRoute {
    const PATH: &'static str = "app/route";
}

/// Performs client-side navigations. Never a full reload.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &str);
}

/// Navigator that publishes [`AppRoute`] to a state store, where the view
/// layer picks it up.
#[derive(Clone)]
pub struct FluxNavigator {
    store: Arc<StateStore>,
}

impl FluxNavigator {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn current(&self) -> Option<String> {
        self.store.get_state::<AppRoute>().map(|r| r.0)
    }
}

impl Navigator for FluxNavigator {
    fn navigate(&self, route: &str) {
        info!(route, "navigate");
        self.store.set_state(AppRoute(route.to_string()));
    }
}
