use std::fmt;

use escrow_client::ApiError;

/// A notification mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    MarkRead,
    MarkAllRead,
    Delete,
}

impl Mutation {
    /// What the user is told when it fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Mutation::MarkRead => "Couldn't mark the notification as read.",
            Mutation::MarkAllRead => "Couldn't mark all notifications as read.",
            Mutation::Delete => "Couldn't delete the notification.",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mutation::MarkRead => "mark_read",
            Mutation::MarkAllRead => "mark_all_read",
            Mutation::Delete => "delete",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// A read failed. The previous page stays on screen.
    #[error("notification fetch failed: {0}")]
    Fetch(#[source] ApiError),

    /// A mutation failed. Nothing local was changed, so nothing rolls back.
    #[error("{action} failed: {source}")]
    Mutation { action: Mutation, source: ApiError },
}

pub(crate) const FETCH_FAILED: &str = "Couldn't refresh notifications. Showing the last loaded list.";
