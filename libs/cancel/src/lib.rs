//! Process-wide abort signal.
//!
//! A single [`Abort`] handle is created per run and cloned into every
//! long-running step (ledger enumeration, scheduled registry fetches, the
//! deletion loop). The first fatal error anywhere stores its reason and wakes
//! all waiters; every later observer sees that same reason.
//!
//! # Invariants
//!
//! - The reason is set at most once; a second `abort()` is a no-op.
//! - All observers see the same final reason.
//! - Cancellation is cooperative: work in flight is not killed, new work is
//!   suppressed at the next checkpoint.

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio::sync::watch;

/// Terminal error carrying the reason the run was aborted.
#[derive(Debug, Clone, Error)]
#[error("run aborted: {reason}")]
pub struct Aborted {
    reason: Arc<str>,
}

impl Aborted {
    /// The reason recorded by the first `abort()` call.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

struct Shared {
    reason: OnceLock<Aborted>,
    tx: watch::Sender<bool>,
}

/// Cloneable handle to the run's abort signal.
#[derive(Clone)]
pub struct Abort {
    shared: Arc<Shared>,
}

impl Abort {
    /// Create a fresh, un-aborted signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                reason: OnceLock::new(),
                tx,
            }),
        }
    }

    /// Abort the run with the given reason.
    ///
    /// Only the first call stores its reason; later calls are no-ops.
    /// Returns true if this call won the race.
    pub fn abort(&self, reason: impl Into<String>) -> bool {
        let won = self
            .shared
            .reason
            .set(Aborted {
                reason: Arc::from(reason.into()),
            })
            .is_ok();
        if won {
            let _ = self.shared.tx.send(true);
        }
        won
    }

    /// Whether the run has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.shared.reason.get().is_some()
    }

    /// The stored reason, if the run has been aborted.
    pub fn reason(&self) -> Option<Aborted> {
        self.shared.reason.get().cloned()
    }

    /// Short-circuit with the stored reason if the run has been aborted.
    ///
    /// Loops call this at item boundaries, never mid-item.
    pub fn checkpoint(&self) -> Result<(), Aborted> {
        match self.shared.reason.get() {
            Some(aborted) => Err(aborted.clone()),
            None => Ok(()),
        }
    }

    /// Resolve when the run is aborted. Never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.shared.tx.subscribe();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without aborting; park forever, the
                // surrounding select loses to real work.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Abort {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Abort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Abort")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_stores_first_reason() {
        let abort = Abort::new();
        assert!(!abort.is_aborted());
        assert!(abort.checkpoint().is_ok());

        assert!(abort.abort("first failure"));
        assert!(!abort.abort("second failure"));

        assert!(abort.is_aborted());
        assert_eq!(abort.reason().unwrap().reason(), "first failure");

        let err = abort.checkpoint().unwrap_err();
        assert_eq!(err.reason(), "first failure");
    }

    #[test]
    fn test_clones_share_state() {
        let abort = Abort::new();
        let observer = abort.clone();

        abort.abort("boom");
        assert!(observer.is_aborted());
        assert_eq!(observer.reason().unwrap().reason(), "boom");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let abort = Abort::new();
        let waiter = abort.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.reason().unwrap()
        });

        abort.abort("shutting down");
        let reason = handle.await.unwrap();
        assert_eq!(reason.reason(), "shutting down");
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_after_abort() {
        let abort = Abort::new();
        abort.abort("done");
        // Must not hang: signal was already raised.
        abort.cancelled().await;
    }
}
