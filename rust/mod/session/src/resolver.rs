use std::sync::Arc;

use escrow_client::{Backend, Role, TokenStore, User};
use tracing::debug;

use crate::error::AuthError;

/// A resolved session. Derived from one `/auth/me` call; never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: User,
    pub role: Role,
}

impl Session {
    pub fn new(identity: User) -> Self {
        let role = identity.role;
        Self { identity, role }
    }

    /// Signed in, but the server has not given a usable role.
    pub fn is_unresolved(&self) -> bool {
        self.role == Role::Unresolved
    }
}

/// Stored credential to [`Session`].
///
/// Every call resolves afresh. Nothing is cached between calls.
#[derive(Clone)]
pub struct SessionResolver {
    tokens: Arc<dyn TokenStore>,
    backend: Arc<dyn Backend>,
}

impl SessionResolver {
    pub fn new(tokens: Arc<dyn TokenStore>, backend: Arc<dyn Backend>) -> Self {
        Self { tokens, backend }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Resolve the current session.
    ///
    /// Without a stored credential this returns [`AuthError::NoCredential`]
    /// and makes no request. Otherwise it makes exactly one `/auth/me`
    /// call; any failure, network included, is a rejection.
    pub async fn resolve(&self) -> Result<Session, AuthError> {
        if self.tokens.get().is_none() {
            debug!("no credential stored, skipping /auth/me");
            return Err(AuthError::NoCredential);
        }
        match self.backend.me().await {
            Ok(user) => {
                debug!(user = %user.id, role = %user.role, "session resolved");
                Ok(Session::new(user))
            }
            Err(e) => {
                debug!(error = %e, "session rejected");
                Err(AuthError::Rejected(e))
            }
        }
    }
}
