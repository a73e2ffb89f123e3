use crate::error::ApiError;
use crate::model::{AuthResponse, Id, LoginRequest, NotificationPage, RegisterRequest, User};

/// The backend surface this client core consumes.
///
/// Implementations attach the stored credential to every call that needs
/// it and report 401-class responses as [`ApiError::Unauthorized`].
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `POST /auth/login`
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError>;

    /// `POST /auth/register`
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// `GET /auth/me`
    async fn me(&self) -> Result<User, ApiError>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<(), ApiError>;

    /// `GET /notifications?page&per_page`
    async fn notifications(&self, page: u32, per_page: u32) -> Result<NotificationPage, ApiError>;

    /// `GET /notifications/unread-count`
    async fn unread_count(&self) -> Result<u64, ApiError>;

    /// `POST /notifications/{id}/read`
    async fn mark_read(&self, id: &Id) -> Result<(), ApiError>;

    /// `POST /notifications/mark-all-read`
    async fn mark_all_read(&self) -> Result<(), ApiError>;

    /// `DELETE /notifications/{id}`
    async fn delete_notification(&self, id: &Id) -> Result<(), ApiError>;
}
