//! Route guard.
//!
//! ```text
//!                 ┌─ ok ──▶ Protected: Authorized(session), render
//! mount ─▶ Loading┤         Public:    Redirecting(LANDING)
//!                 └─ err ─▶ Protected: Redirecting(SIGN_IN), clear credential
//!                           Public:    Anonymous, render
//! ```
//!
//! Each mount resolves once. Remounting starts again from `Loading`. After
//! unmount the resolution's outcome is dropped: no phase write, no render,
//! no navigation.

use std::sync::Arc;

use escrow_flux::{Scope, State, StateStore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::nav::{navigation_for, NavItem};
use crate::resolver::{Session, SessionResolver};
use crate::route::{Navigator, LANDING, SIGN_IN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Requires a session; sends everyone else to sign-in.
    Protected,
    /// For signed-out users; sends signed-in users to the landing view.
    Public,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardPhase {
    /// Resolving. Protected views show a spinner and nothing else.
    Loading,
    Authorized(Session),
    /// No session and the view is public: rendered without identity.
    Anonymous,
    Redirecting(String),
}

impl State for GuardPhase {
    const PATH: &'static str = "route/guard";
}

impl GuardPhase {
    pub fn is_settled(&self) -> bool {
        !matches!(self, GuardPhase::Loading)
    }
}

/// What a guarded view receives when it renders.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// Present for protected views, absent for public ones.
    pub session: Option<Session>,
    pub nav: Vec<NavItem>,
}

/// Gate for one navigable view.
#[derive(Clone)]
pub struct RouteGuard {
    kind: GuardKind,
    resolver: SessionResolver,
    navigator: Arc<dyn Navigator>,
    store: Arc<StateStore>,
}

impl RouteGuard {
    pub fn new(
        kind: GuardKind,
        resolver: SessionResolver,
        navigator: Arc<dyn Navigator>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            kind,
            resolver,
            navigator,
            store,
        }
    }

    pub fn kind(&self) -> GuardKind {
        self.kind
    }

    /// Mount the guard around a view.
    ///
    /// `children` runs at most once, and only if this mount authorizes it.
    pub fn mount<F>(&self, children: F) -> GuardMount
    where
        F: FnOnce(RenderContext) + Send + 'static,
    {
        let scope = Scope::new(Arc::clone(&self.store));
        scope.set_state(GuardPhase::Loading);

        let guard = self.clone();
        let task_scope = scope.clone();
        let task = scope.spawn(async move {
            let outcome = guard.resolver.resolve().await;
            guard.settle(&task_scope, outcome, children)
        });
        GuardMount { scope, task }
    }

    fn settle<F>(
        &self,
        scope: &Scope,
        outcome: Result<Session, AuthError>,
        children: F,
    ) -> GuardPhase
    where
        F: FnOnce(RenderContext),
    {
        let (phase, rejected) = match (self.kind, outcome) {
            (GuardKind::Protected, Ok(session)) => (GuardPhase::Authorized(session), None),
            (GuardKind::Protected, Err(err)) => {
                (GuardPhase::Redirecting(SIGN_IN.to_string()), Some(err))
            }
            (GuardKind::Public, Ok(_)) => (GuardPhase::Redirecting(LANDING.to_string()), None),
            (GuardKind::Public, Err(err)) => (GuardPhase::Anonymous, Some(err)),
        };

        if !scope.set_state(phase.clone()) {
            debug!("guard unmounted before resolution settled");
            return phase;
        }
        if let Some(err) = rejected {
            self.sign_out(&err);
        }
        match &phase {
            GuardPhase::Authorized(session) => children(RenderContext {
                session: Some(session.clone()),
                nav: navigation_for(session.role),
            }),
            GuardPhase::Anonymous => children(RenderContext {
                session: None,
                nav: Vec::new(),
            }),
            GuardPhase::Redirecting(route) => self.navigator.navigate(route),
            GuardPhase::Loading => {}
        }
        phase
    }

    /// Forced sign-out: drop the local credential. The redirect follows.
    fn sign_out(&self, err: &AuthError) {
        if matches!(err, AuthError::NoCredential) {
            return;
        }
        info!(error = %err, "session rejected, clearing credential");
        if let Err(e) = self.resolver.tokens().clear() {
            warn!(error = %e, "failed to clear credential");
        }
    }
}

/// One mount of a [`RouteGuard`]. Dropping it unmounts.
pub struct GuardMount {
    scope: Scope,
    task: JoinHandle<Option<GuardPhase>>,
}

impl GuardMount {
    pub fn is_mounted(&self) -> bool {
        self.scope.is_mounted()
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    /// Wait for the resolution. `None` if the guard unmounted first.
    ///
    /// Call at most once per mount.
    pub async fn settled(&mut self) -> Option<GuardPhase> {
        match (&mut self.task).await {
            Ok(Some(phase)) if self.scope.is_mounted() => Some(phase),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "guard task failed");
                None
            }
        }
    }
}

impl Drop for GuardMount {
    fn drop(&mut self) {
        self.scope.unmount();
    }
}
