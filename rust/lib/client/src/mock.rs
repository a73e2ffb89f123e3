//! In-memory [`Backend`] for tests.
//!
//! Emulates the server closely enough to test reconciliation: the feed is
//! newest-first, `read_at` is only ever set, mutations on unknown ids return
//! 404, and every authenticated endpoint checks the credential held by the
//! shared [`TokenStore`]. Calls are logged, failures can be injected per
//! endpoint, and an endpoint can be held in flight until released.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Semaphore;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::model::{
    AuthResponse, Id, LoginRequest, Notification, NotificationPage, PageMeta, Payload,
    RegisterRequest, Role, User,
};
use crate::token::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Register,
    Me,
    Logout,
    Notifications,
    UnreadCount,
    MarkRead,
    MarkAllRead,
    Delete,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<Account>,
    sessions: HashMap<String, Id>,
    notifications: Vec<Notification>,
    next_token: u64,
    calls: Vec<Endpoint>,
    failures: HashMap<Endpoint, VecDeque<u16>>,
}

pub struct MockBackend {
    tokens: Arc<dyn TokenStore>,
    state: Mutex<MockState>,
    gates: Mutex<HashMap<Endpoint, Arc<Semaphore>>>,
}

/// Build a user for seeding.
pub fn user(id: u64, name: &str, role: Role) -> User {
    User {
        id: Id::from(id),
        name: name.to_string(),
        email: format!("{}@example.test", name.to_ascii_lowercase()),
        phone: None,
        role,
        extra: serde_json::Map::new(),
    }
}

/// Build a project notification for seeding.
pub fn notification(id: &str, project_id: u64, unread: bool, age_minutes: i64) -> Notification {
    let created_at = Utc::now() - Duration::minutes(age_minutes);
    let raw = json!({ "project_id": project_id });
    Notification {
        id: Id::from(id),
        category: "project_update".to_string(),
        title: format!("Project {project_id} updated"),
        message: "A project you follow changed".to_string(),
        payload: Payload::resolve("project_update", &raw),
        raw_payload: raw,
        read_at: if unread { None } else { Some(created_at) },
        created_at,
    }
}

impl MockBackend {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens,
            state: Mutex::new(MockState::default()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ====================================================================
    // Seeding
    // ====================================================================

    pub fn add_account(&self, user: User, password: &str) {
        self.state().accounts.push(Account {
            user,
            password: password.to_string(),
        });
    }

    /// Register `user`, open a server session and store its credential.
    pub fn sign_in(&self, user: User) -> String {
        let token = {
            let mut state = self.state();
            let token = issue_token(&mut state, &user.id);
            state.accounts.push(Account {
                user,
                password: "secret".to_string(),
            });
            token
        };
        let _ = self.tokens.set(&token);
        token
    }

    /// Invalidate every server session (credential expiry or revocation).
    pub fn revoke_sessions(&self) {
        self.state().sessions.clear();
    }

    /// Seed `total` notifications, newest first; the newest `unread` are unread.
    pub fn seed_notifications(&self, total: usize, unread: usize) {
        let mut state = self.state();
        state.notifications = (0..total)
            .map(|i| notification(&format!("n{}", i + 1), i as u64 + 1, i < unread, i as i64))
            .collect();
    }

    /// Replace the feed. `list` is taken as newest-first.
    pub fn set_notifications(&self, list: Vec<Notification>) {
        self.state().notifications = list;
    }

    /// Add a notification at the top of the feed.
    pub fn push_notification(&self, n: Notification) {
        self.state().notifications.insert(0, n);
    }

    /// Clear `read_at` behind the client's back, as a misbehaving server
    /// would.
    pub fn force_unread(&self, id: &str) {
        if let Some(n) = self
            .state()
            .notifications
            .iter_mut()
            .find(|n| n.id.as_str() == id)
        {
            n.read_at = None;
        }
    }

    pub fn server_notification(&self, id: &str) -> Option<Notification> {
        self.state()
            .notifications
            .iter()
            .find(|n| n.id.as_str() == id)
            .cloned()
    }

    pub fn server_unread(&self) -> u64 {
        self.state().notifications.iter().filter(|n| n.is_unread()).count() as u64
    }

    // ====================================================================
    // Instrumentation
    // ====================================================================

    /// Fail the next `times` calls to `endpoint` with `status`.
    pub fn fail(&self, endpoint: Endpoint, status: u16, times: usize) {
        self.state()
            .failures
            .entry(endpoint)
            .or_default()
            .extend(std::iter::repeat(status).take(times));
    }

    /// Hold calls to `endpoint` in flight until [`release`](Self::release).
    pub fn hold(&self, endpoint: Endpoint) {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint, Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held calls to `endpoint` proceed.
    pub fn release(&self, endpoint: Endpoint, n: usize) {
        if let Some(gate) = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint)
        {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.state().calls.clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state().calls.iter().filter(|c| **c == endpoint).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    // ====================================================================
    // Request plumbing
    // ====================================================================

    /// Log the call, wait at its gate, then apply any injected failure.
    async fn enter(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        self.state().calls.push(endpoint);
        let gate = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint)
            .cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let injected = self
            .state()
            .failures
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(status) => Err(ApiError::from_status(status, "injected failure")),
            None => Ok(()),
        }
    }

    fn authorize(&self, state: &MockState) -> Result<Id, ApiError> {
        let token = self
            .tokens
            .get()
            .ok_or_else(|| ApiError::Unauthorized("Unauthenticated.".into()))?;
        state
            .sessions
            .get(&token)
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Unauthenticated.".into()))
    }
}

fn issue_token(state: &mut MockState, user_id: &Id) -> String {
    state.next_token += 1;
    let token = format!("mock-token-{}", state.next_token);
    state.sessions.insert(token.clone(), user_id.clone());
    token
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.enter(Endpoint::Login).await?;
        let mut state = self.state();
        let user = state
            .accounts
            .iter()
            .find(|a| a.user.email == req.email && a.password == req.password)
            .map(|a| a.user.clone())
            .ok_or_else(|| ApiError::Validation {
                message: "The provided credentials are incorrect.".into(),
            })?;
        let token = issue_token(&mut state, &user.id);
        Ok(AuthResponse { user, token })
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.enter(Endpoint::Register).await?;
        let mut state = self.state();
        if state.accounts.iter().any(|a| a.user.email == req.email) {
            return Err(ApiError::Validation {
                message: "The email has already been taken.".into(),
            });
        }
        let id = Id::from(state.accounts.len() as u64 + 1);
        let user = User {
            id: id.clone(),
            name: req.name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            role: req.role,
            extra: serde_json::Map::new(),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: req.password.clone(),
        });
        let token = issue_token(&mut state, &id);
        Ok(AuthResponse { user, token })
    }

    async fn me(&self) -> Result<User, ApiError> {
        self.enter(Endpoint::Me).await?;
        let state = self.state();
        let id = self.authorize(&state)?;
        state
            .accounts
            .iter()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
            .ok_or_else(|| ApiError::Unauthorized("Unauthenticated.".into()))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.enter(Endpoint::Logout).await?;
        let mut state = self.state();
        self.authorize(&state)?;
        if let Some(token) = self.tokens.get() {
            state.sessions.remove(&token);
        }
        Ok(())
    }

    async fn notifications(&self, page: u32, per_page: u32) -> Result<NotificationPage, ApiError> {
        self.enter(Endpoint::Notifications).await?;
        let state = self.state();
        self.authorize(&state)?;
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total = state.notifications.len() as u64;
        let last_page = (total.div_ceil(per_page as u64)).max(1) as u32;
        let start = ((page - 1) * per_page) as usize;
        let data: Vec<Notification> = state
            .notifications
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            (Some(start as u64 + 1), Some((start + data.len()) as u64))
        };
        Ok(NotificationPage {
            data,
            meta: PageMeta {
                current_page: page,
                last_page,
                per_page,
                total,
                from,
                to,
            },
        })
    }

    async fn unread_count(&self) -> Result<u64, ApiError> {
        self.enter(Endpoint::UnreadCount).await?;
        let state = self.state();
        self.authorize(&state)?;
        Ok(state.notifications.iter().filter(|n| n.is_unread()).count() as u64)
    }

    async fn mark_read(&self, id: &Id) -> Result<(), ApiError> {
        self.enter(Endpoint::MarkRead).await?;
        let mut state = self.state();
        self.authorize(&state)?;
        let n = state
            .notifications
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("notification {id}")))?;
        if n.read_at.is_none() {
            n.read_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.enter(Endpoint::MarkAllRead).await?;
        let mut state = self.state();
        self.authorize(&state)?;
        let now = Utc::now();
        for n in state.notifications.iter_mut().filter(|n| n.read_at.is_none()) {
            n.read_at = Some(now);
        }
        Ok(())
    }

    async fn delete_notification(&self, id: &Id) -> Result<(), ApiError> {
        self.enter(Endpoint::Delete).await?;
        let mut state = self.state();
        self.authorize(&state)?;
        let before = state.notifications.len();
        state.notifications.retain(|n| &n.id != id);
        if state.notifications.len() == before {
            return Err(ApiError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;

    fn backend() -> (Arc<MemoryTokenStore>, MockBackend) {
        let tokens = Arc::new(MemoryTokenStore::default());
        let backend = MockBackend::new(tokens.clone());
        (tokens, backend)
    }

    #[tokio::test]
    async fn me_requires_live_session() {
        let (tokens, backend) = backend();
        assert!(backend.me().await.unwrap_err().is_unauthorized());

        backend.sign_in(user(1, "Ada", Role::Admin));
        assert!(tokens.get().is_some());
        assert_eq!(backend.me().await.unwrap().role, Role::Admin);

        backend.revoke_sessions();
        assert!(backend.me().await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn pagination_meta() {
        let (_, backend) = backend();
        backend.sign_in(user(1, "Ada", Role::Client));
        backend.seed_notifications(25, 3);

        let page = backend.notifications(3, 10).await.unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.meta.last_page, 3);
        assert_eq!((page.meta.from, page.meta.to), (Some(21), Some(25)));

        let beyond = backend.notifications(9, 10).await.unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.meta.from, None);
    }

    #[tokio::test]
    async fn mutations_are_idempotent_or_not_found() {
        let (_, backend) = backend();
        backend.sign_in(user(1, "Ada", Role::Client));
        backend.seed_notifications(3, 3);

        backend.mark_read(&Id::from("n1")).await.unwrap();
        let first = backend.server_notification("n1").unwrap().read_at;
        backend.mark_read(&Id::from("n1")).await.unwrap();
        assert_eq!(backend.server_notification("n1").unwrap().read_at, first);
        assert_eq!(backend.server_unread(), 2);

        backend.delete_notification(&Id::from("n2")).await.unwrap();
        assert!(backend
            .delete_notification(&Id::from("n2"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let (_, backend) = backend();
        backend.sign_in(user(1, "Ada", Role::Client));
        backend.fail(Endpoint::UnreadCount, 503, 1);

        assert!(backend.unread_count().await.is_err());
        assert_eq!(backend.unread_count().await.unwrap(), 0);
        assert_eq!(backend.count(Endpoint::UnreadCount), 2);
    }
}
