//! Flux: client-side UI state engine for the escrow console.
//!
//! Rust owns the state and the logic; the renderer only observes paths and
//! draws. Components (route guards, the notification bell, list pages) write
//! their view state into a shared [`StateStore`] and the renderer subscribes.
//!
//! # Primitives
//!
//! - `get(path)` / `set(path, value)`: read and write state, Arc zero-copy
//! - `emit(path, payload)`: send a request, pattern-routed to handler(s)
//! - `subscribe(pattern)`: observe state changes
//!
//! # Path Addressing
//!
//! All state lives in a flat `/`-separated namespace:
//! - Global: `app/route`, `ui/toast`
//! - Per surface: `bell/feed`, `bell/unread`, `inbox/feed`
//!
//! Patterns accept `+` (exactly one level) and `#` (all remaining levels).
//!
//! # Lifecycle
//!
//! A mounted component owns a [`Scope`]. Writes made through the scope are
//! dropped once the component unmounts, tasks spawned on it stop, and
//! [`Listener`] handles detach on drop. Results of requests that were still
//! in flight at unmount never reach the store.

pub mod app;
pub mod events;
pub mod router;
pub mod scope;
pub mod store;
pub mod ticker;
pub mod topic;
pub mod value;

pub use app::Flux;
pub use events::{EventHub, Listener};
pub use router::{BoxFuture, Request, Router};
pub use scope::Scope;
pub use store::{ChangeHandler, StateStore};
pub use ticker::Ticker;
pub use topic::Pattern;
pub use value::{State, StateValue, SubscriptionId};
