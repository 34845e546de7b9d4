//! Notification sink

use std::fmt;

use mockall::automock;
use tracing::{info, warn};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Operation succeeded.
    Success,

    /// Something went wrong.
    Error,

    /// Neutral information.
    Info,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        })
    }
}

/// Shopper-facing feedback the cart engine emits. Fire-and-forget.
#[automock]
pub trait Notifier: Send + Sync {
    /// Show a toast message.
    fn notify(&self, message: &str, kind: NoticeKind);

    /// Update the cart badge with the number of non-gift units.
    fn badge(&self, total_quantity: u32);

    /// Ask the shopper to sign in before performing `action`.
    fn request_authentication(&self, action: &str);
}

/// Notifier writing every notice to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Error => warn!(%kind, notice = message, "notice"),
            NoticeKind::Success | NoticeKind::Info => info!(%kind, notice = message, "notice"),
        }
    }

    fn badge(&self, total_quantity: u32) {
        info!(total_quantity, "cart badge updated");
    }

    fn request_authentication(&self, action: &str) {
        info!(action, "sign in required");
    }
}
