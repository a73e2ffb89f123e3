//! Notification synchronization.
//!
//! [`NotificationStore`] caches one page of the feed and the unread count,
//! and reconciles both with the server after every mutation. Two surfaces
//! sit on top of it:
//!
//! - [`BellDropdown`]: small first page, 30 s polling, closes on an outside
//!   pointer-down
//! - [`NotificationList`]: full pagination with per-item controls
//!
//! The server is the only source of truth. Nothing is flipped locally; every
//! change shows up through a re-fetch.

pub mod bell;
pub mod config;
pub mod error;
pub mod list;
pub mod requests;
pub mod store;
pub mod toast;

pub use bell::{BellDropdown, BellOpen, Bounds, PointerDown};
pub use config::SurfaceConfig;
pub use error::{Mutation, NotifyError};
pub use list::NotificationList;
pub use requests::{register_bell, register_list};
pub use store::{FeedView, NotificationStore, UnreadBadge};
pub use toast::{Toast, ToastKind};
