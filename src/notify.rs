//! User-facing notification sink.

use tracing::{error, info, warn};

/// Where user-facing messages go (toasts, a status bar, a log).
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);
}

/// Notifier that emits every message as a tracing event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(kind = "success", "{message}");
    }

    fn error(&self, message: &str) {
        error!(kind = "error", "{message}");
    }

    fn warning(&self, message: &str) {
        warn!(kind = "warning", "{message}");
    }

    fn info(&self, message: &str) {
        info!(kind = "info", "{message}");
    }
}
