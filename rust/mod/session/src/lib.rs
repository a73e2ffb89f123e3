//! Session and authorization guard.
//!
//! - [`SessionResolver`] turns the stored credential into a [`Session`]
//! - [`RouteGuard`] gates a view on that resolution, once per mount
//! - [`navigation_for`] scopes the navigation to the resolved role
//! - [`AuthFlow`] runs login, registration and logout
//!
//! There is no global session. A guard resolves the session and hands it to
//! the subtree it renders through [`RenderContext`]; anything else that needs
//! the identity receives it from there.

pub mod error;
pub mod flow;
pub mod guard;
pub mod nav;
pub mod resolver;
pub mod route;

pub use error::AuthError;
pub use flow::{register_auth, AuthFlow, AuthState, LoginReq, LogoutReq, RegisterReq};
pub use guard::{GuardKind, GuardMount, GuardPhase, RenderContext, RouteGuard};
pub use nav::{navigation_for, NavItem};
pub use resolver::{Session, SessionResolver};
pub use route::{AppRoute, FluxNavigator, Navigator, LANDING, SIGN_IN};
