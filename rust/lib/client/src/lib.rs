//! Escrow marketplace REST client.
//!
//! The wire model (users, notifications, pagination), the credential
//! store, and the [`Backend`] trait every client-side service talks to.
//! [`HttpBackend`] is the reqwest implementation; it reads the bearer
//! credential from a [`TokenStore`] on every request.
//!
//! # Usage
//!
//! ```ignore
//! use escrow_client::{Backend, FileTokenStore, HttpBackend, CookiePolicy};
//!
//! let tokens = Arc::new(FileTokenStore::new("/tmp/escrow.cookie", CookiePolicy::default()));
//! let backend = HttpBackend::new("https://escrow.example.com/api", tokens);
//! let unread = backend.unread_count().await?;
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod model;
pub mod token;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use backend::Backend;
pub use error::ApiError;
pub use http::HttpBackend;
pub use model::{
    AuthResponse, Id, LoginRequest, NavTarget, Notification, NotificationPage, PageMeta, Payload,
    RegisterRequest, Role, UnreadCount, User,
};
pub use token::{
    CookiePolicy, FileTokenStore, MemoryTokenStore, SameSite, StoredCookie, TokenStore,
    COOKIE_NAME, CREDENTIAL_LIFETIME_DAYS,
};
