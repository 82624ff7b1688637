use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
    /// User-initiated or timed-out cancellation. Never reported as `Error`.
    Cancelled,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Writes notifications to the log. Used when no UI is attached.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success | NotificationKind::Info | NotificationKind::Cancelled => {
                info!(?kind, "{message}")
            }
            NotificationKind::Warning => warn!("{message}"),
            NotificationKind::Error => error!("{message}"),
        }
    }
}
