//! Command implementations.
//!
//! Each command builds a [`Client`] from the config file, the same way the
//! view layer wires the session and notification crates together.

pub mod auth;
pub mod config;
pub mod notifications;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use escrow_client::{FileTokenStore, HttpBackend, TokenStore};
use escrow_flux::StateStore;
use escrow_notify::Toast;
use escrow_session::{
    AuthFlow, FluxNavigator, GuardKind, GuardPhase, RouteGuard, Session, SessionResolver,
};
use tracing::{debug, warn};

use crate::config::ClientConfig;

/// Everything a command needs, wired from one config.
pub struct Client {
    pub config: ClientConfig,
    pub flux: Arc<StateStore>,
    pub tokens: Arc<FileTokenStore>,
    pub backend: Arc<HttpBackend>,
    pub navigator: Arc<FluxNavigator>,
}

impl Client {
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = ClientConfig::load_with_env(config_path)?;
        let server = config.server()?.to_string();
        if config.environment.is_production() && !server.starts_with("https://") {
            anyhow::bail!("Production credentials are only sent over https; got {}.", server);
        }

        let token_path = config.token_path(config_path);
        debug!(
            server = %server,
            environment = %config.environment,
            credential = %token_path.display(),
            "client configured"
        );
        let tokens = Arc::new(FileTokenStore::new(token_path, config.cookie_policy()));
        let backend = Arc::new(HttpBackend::new(server, tokens.clone()));
        let flux = Arc::new(StateStore::new());
        let navigator = Arc::new(FluxNavigator::new(flux.clone()));
        Ok(Self {
            config,
            flux,
            tokens,
            backend,
            navigator,
        })
    }

    pub fn auth_flow(&self) -> AuthFlow {
        AuthFlow::new(
            self.backend.clone(),
            self.tokens.clone(),
            self.navigator.clone(),
            self.flux.clone(),
        )
    }

    pub fn guard(&self, kind: GuardKind) -> RouteGuard {
        let resolver = SessionResolver::new(self.tokens.clone(), self.backend.clone());
        RouteGuard::new(kind, resolver, self.navigator.clone(), self.flux.clone())
    }

    /// Resolve the session through a protected guard, as a protected view
    /// would on mount.
    pub async fn require_session(&self) -> Result<Session> {
        if self.tokens.get().is_none() {
            anyhow::bail!("Not signed in. Run `escrow login`.");
        }
        let mut mount = self.guard(GuardKind::Protected).mount(|_| {});
        match mount.settled().await {
            Some(GuardPhase::Authorized(session)) => Ok(session),
            phase => {
                warn!(?phase, "protected guard did not authorize");
                anyhow::bail!("Session expired or rejected. Run `escrow login`.")
            }
        }
    }

    /// Print the last toast, if any, to stderr.
    pub fn report_toast(&self) {
        if let Some(toast) = self.flux.get_state::<Toast>() {
            eprintln!("{}", toast.message);
        }
    }
}
