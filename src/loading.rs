//! Process-wide count of in-flight requests.

use std::sync::Arc;

use tokio::sync::watch;

/// Number of requests currently in flight; "busy" iff non-zero.
///
/// The count only moves through [`BusyGuard`]: [`LoadingCounter::enter`]
/// increments and dropping the guard decrements, so every exit path of a
/// request (success, failure, panic, cancellation) settles it exactly once.
#[derive(Clone)]
pub struct LoadingCounter {
    count: Arc<watch::Sender<usize>>,
}

impl LoadingCounter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Mark one request as started.
    #[must_use = "dropping the guard immediately ends the request"]
    pub fn enter(&self) -> BusyGuard {
        self.count.send_modify(|n| *n += 1);
        BusyGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn current(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.current() > 0
    }

    /// Observe the count as it changes.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    /// Resolve once no request is in flight.
    pub async fn idle(&self) {
        let mut rx = self.subscribe();
        // Sender is owned by self, so wait_for can only fail if it is dropped.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for LoadingCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements its [`LoadingCounter`] when dropped.
pub struct BusyGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}
