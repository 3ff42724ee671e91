//! Cancellation and deadline for one fetch

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a fetch stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelCause {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancels every [`FetchContext`] derived from the one it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Caller-controlled cancellation signal plus an optional deadline.
///
/// Cheap to clone; clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl FetchContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// A context plus the handle that cancels it
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let cx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (cx, CancelHandle { tx: Arc::new(tx) })
    }

    /// Derive a context that also expires after `timeout`.
    /// An earlier existing deadline is kept. A timeout too large to represent
    /// adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// Derive a context that also expires at `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cause, if the context is already done
    pub fn err(&self) -> Option<CancelCause> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err` once the context is done
    pub fn check(&self) -> Result<(), CancelCause> {
        match self.err() {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }

    /// Resolves when the context is cancelled or its deadline passes
    pub async fn done(&self) -> CancelCause {
        let cancelled = async {
            if let Some(mut rx) = self.cancel.clone() {
                // Err means every handle was dropped without cancelling
                if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                    return;
                }
            }
            pending::<()>().await
        };
        let expired = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => CancelCause::Cancelled,
            _ = expired => CancelCause::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_done() {
        let cx = FetchContext::background();
        assert_eq!(cx.err(), None);
        assert!(cx.check().is_ok());

        let waited = tokio::time::timeout(Duration::from_millis(20), cx.done()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_cancel_is_observed_by_clones() {
        let (cx, handle) = FetchContext::with_cancel();
        let child = cx.with_timeout(Duration::from_secs(60));
        assert_eq!(child.err(), None);

        handle.cancel();
        assert_eq!(cx.err(), Some(CancelCause::Cancelled));
        assert_eq!(child.check(), Err(CancelCause::Cancelled));
        assert_eq!(child.done().await, CancelCause::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (cx, handle) = FetchContext::with_cancel();
        let waiter = tokio::spawn(async move { cx.done().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let cause = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cause, CancelCause::Cancelled);
    }

    #[tokio::test]
    async fn test_deadline() {
        let cx = FetchContext::background().with_timeout(Duration::from_millis(10));
        assert_eq!(cx.done().await, CancelCause::DeadlineExceeded);
        assert_eq!(cx.err(), Some(CancelCause::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let cx = FetchContext::background().with_timeout(Duration::from_millis(5));
        let first = cx.deadline().unwrap();

        let child = cx.with_timeout(Duration::from_secs(30));
        assert_eq!(child.deadline(), Some(first));

        let sooner = FetchContext::background()
            .with_timeout(Duration::from_secs(30))
            .with_timeout(Duration::from_millis(5));
        assert!(sooner.deadline().unwrap() < Instant::now() + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_keeps_deadline() {
        let cx = FetchContext::background().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(cx.deadline(), None);
        assert_eq!(cx.err(), None);

        let bounded = FetchContext::background().with_timeout(Duration::from_secs(60));
        let first = bounded.deadline();
        let child = bounded.with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), first);
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (cx, handle) = FetchContext::with_cancel();
        drop(handle);

        assert_eq!(cx.err(), None);
        let waited = tokio::time::timeout(Duration::from_millis(20), cx.done()).await;
        assert!(waited.is_err());
    }
}
