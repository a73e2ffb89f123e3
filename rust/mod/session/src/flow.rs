//! Login, registration and logout.
//!
//! These are the only writers of the credential. Each publishes
//! [`AuthState`] so a form can show progress and the last error.

use std::sync::Arc;

use escrow_client::{Backend, LoginRequest, RegisterRequest, TokenStore};
use escrow_flux::{Flux, Request, State, StateStore};
use tracing::{info, warn};

use crate::error::AuthError;
use crate::resolver::Session;
use crate::route::{Navigator, LANDING, SIGN_IN};

/// Sign-in / sign-up form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub busy: bool,
    pub error: Option<String>,
}

impl State for AuthState {
    const PATH: &'static str = "auth/state";
}

pub struct AuthFlow {
    backend: Arc<dyn Backend>,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    store: Arc<StateStore>,
}

impl AuthFlow {
    pub fn new(
        backend: Arc<dyn Backend>,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            backend,
            tokens,
            navigator,
            store,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.set_busy();
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.backend.login(&req).await;
        self.finish(result.map_err(AuthError::from))
    }

    /// Register and sign in. The password confirmation is checked before
    /// anything is sent.
    pub async fn register(&self, req: RegisterRequest) -> Result<Session, AuthError> {
        if req.password != req.password_confirmation {
            let err = AuthError::PasswordMismatch;
            self.set_error(&err);
            return Err(err);
        }
        self.set_busy();
        let result = self.backend.register(&req).await;
        self.finish(result.map_err(AuthError::from))
    }

    /// Sign out. The server call is best-effort; the local credential is
    /// cleared and the user sent to sign-in whatever it returns.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            warn!(error = %e, "logout request failed, signing out locally");
        }
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "failed to clear credential");
        }
        self.store.set_state(AuthState::default());
        self.navigator.navigate(SIGN_IN);
        info!("signed out");
    }

    fn finish(
        &self,
        result: Result<escrow_client::AuthResponse, AuthError>,
    ) -> Result<Session, AuthError> {
        let resp = match result {
            Ok(resp) => resp,
            Err(err) => {
                self.set_error(&err);
                return Err(err);
            }
        };
        if let Err(e) = self.tokens.set(&resp.token) {
            let err = AuthError::from(e);
            self.set_error(&err);
            return Err(err);
        }
        info!(user = %resp.user.id, role = %resp.user.role, "signed in");
        self.store.set_state(AuthState::default());
        self.navigator.navigate(LANDING);
        Ok(Session::new(resp.user))
    }

    fn set_busy(&self) {
        self.store.set_state(AuthState {
            busy: true,
            error: None,
        });
    }

    fn set_error(&self, err: &AuthError) {
        self.store.set_state(AuthState {
            busy: false,
            error: Some(err.user_message()),
        });
    }
}

pub struct LoginReq {
    pub email: String,
    pub password: String,
}

impl Request for LoginReq {
    const PATH: &'static str = "auth/login";
}

pub struct RegisterReq(pub RegisterRequest);

impl Request for RegisterReq {
    const PATH: &'static str = "auth/register";
}

pub struct LogoutReq;

impl Request for LogoutReq {
    const PATH: &'static str = "auth/logout";
}

/// Route `auth/*` requests to `flow`. Outcomes land in [`AuthState`] and
/// the current route.
pub fn register_auth(flux: &Flux, flow: Arc<AuthFlow>) {
    let f = flow.clone();
    flux.on(LoginReq::PATH, move |_, payload, _| {
        let flow = f.clone();
        let creds = payload
            .downcast_ref::<LoginReq>()
            .map(|r| (r.email.clone(), r.password.clone()));
        async move {
            if let Some((email, password)) = creds {
                let _ = flow.login(&email, &password).await;
            }
        }
    });

    let f = flow.clone();
    flux.on(RegisterReq::PATH, move |_, payload, _| {
        let flow = f.clone();
        let req = payload.downcast_ref::<RegisterReq>().map(|r| r.0.clone());
        async move {
            if let Some(req) = req {
                let _ = flow.register(req).await;
            }
        }
    });

    flux.on(LogoutReq::PATH, move |_, _, _| {
        let flow = flow.clone();
        async move { flow.logout().await }
    });
}
