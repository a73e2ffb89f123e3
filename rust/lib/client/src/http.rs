use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::model::{
    AuthResponse, Id, LoginRequest, NotificationPage, RegisterRequest, UnreadCount, User,
    UserEnvelope,
};
use crate::token::TokenStore;

/// Ids are opaque strings; escape them before they land in a path.
fn segment(id: &Id) -> String {
    urlencoding::encode(id.as_str()).into_owned()
}

/// reqwest-backed [`Backend`].
///
/// Every request reads the credential from the [`TokenStore`] at send
/// time, so a login or logout is picked up by the very next call.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, tokens)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer credential, if one is stored.
    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(reqwest::header::ACCEPT, "application/json");
        match self.tokens.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "backend rejected request");
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    async fn parse<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ApiError> {
        let resp = Self::check(resp).await?;
        resp.json::<R>()
            .await
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .authed(self.http.post(self.url("/auth/login")))
            .json(req)
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .authed(self.http.post(self.url("/auth/register")))
            .json(req)
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn me(&self) -> Result<User, ApiError> {
        let resp = self.authed(self.http.get(self.url("/auth/me"))).send().await?;
        Self::parse::<UserEnvelope>(resp).await.map(UserEnvelope::into_user)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let resp = self.authed(self.http.post(self.url("/auth/logout"))).send().await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn notifications(&self, page: u32, per_page: u32) -> Result<NotificationPage, ApiError> {
        let resp = self
            .authed(self.http.get(self.url("/notifications")))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn unread_count(&self) -> Result<u64, ApiError> {
        let resp = self
            .authed(self.http.get(self.url("/notifications/unread-count")))
            .send()
            .await?;
        Self::parse::<UnreadCount>(resp).await.map(|c| c.count)
    }

    async fn mark_read(&self, id: &Id) -> Result<(), ApiError> {
        let path = format!("/notifications/{}/read", segment(id));
        let resp = self.authed(self.http.post(self.url(&path))).send().await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        let resp = self
            .authed(self.http.post(self.url("/notifications/mark-all-read")))
            .send()
            .await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn delete_notification(&self, id: &Id) -> Result<(), ApiError> {
        let path = format!("/notifications/{}", segment(id));
        let resp = self.authed(self.http.delete(self.url(&path))).send().await?;
        Self::check(resp).await.map(|_| ())
    }
}
