//! Cancellation handle for multi-step reads.
//!
//! An aggregation awaits several queries in sequence. Each await goes
//! through [`RequestScope::run`]; once the scope is cancelled the pending
//! query is dropped and every later call resolves to `None` without being
//! polled, so results that arrive after cancellation are never used.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct RequestScope {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestScope {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancels this scope and every clone of it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only errs on drop.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Drives `fut` unless the scope is cancelled first.
    ///
    /// Returns `None` when cancelled before or while `fut` runs.
    pub async fn run<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Returns a guard that cancels the scope when dropped.
    ///
    /// Tie it to the lifetime of whatever owns the request so that an
    /// abandoned request stops issuing queries.
    #[must_use]
    pub fn drop_guard(&self) -> ScopeGuard {
        ScopeGuard {
            scope: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ScopeGuard {
    scope: RequestScope,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
