use std::sync::atomic::{AtomicU64, Ordering};

use escrow_flux::State;

static NEXT_TOAST: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    /// Non-blocking, disappears on its own.
    Transient,
    /// Stays until dismissed.
    Failure,
}

/// The most recent toast. Each has a fresh id, so posting the same message
/// twice is still two toasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

impl State for Toast {
    const PATH: &'static str = "ui/toast";
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            id: NEXT_TOAST.fetch_add(1, Ordering::Relaxed),
            kind,
            message: message.into(),
        }
    }
}
