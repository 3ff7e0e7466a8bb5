//! Caller-controlled cancellation and deadlines for store operations.
//!
//! Nothing in this crate imposes its own timeout. The caller builds a
//! `Context`, optionally attaches a deadline or a cancellation signal, and
//! every instrumented primitive races its store call against it. Whichever
//! side loses is dropped, which aborts the in-flight driver future.

use crate::error::DbError;
use std::future::{pending, Future};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    DeadlineExceeded,
}

impl From<Interrupted> for DbError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => DbError::Cancelled,
            Interrupted::DeadlineExceeded => DbError::DeadlineExceeded,
        }
    }
}

/// The execution context handed to every store operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every `Context` derived from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // The send only fails once every receiver is gone, at which point
        // nobody is left to observe the cancellation anyway.
        let _ = self.tx.send(true);
    }
}

impl Context {
    /// A context with no deadline that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a copy of this context that expires `timeout` from now.
    /// An earlier deadline already on the context is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Attaches a fresh cancellation signal, replacing any previous one.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a background context.
    pub async fn done(&self) -> Interrupted {
        let cancelled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    let signalled = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                    if !signalled {
                        // Handle dropped without cancelling.
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Interrupted::Cancelled,
            _ = expired => Interrupted::DeadlineExceeded,
        }
    }

    /// Drives `operation` to completion unless the context finishes first.
    pub async fn run<F, T>(&self, operation: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = operation => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_context_runs_to_completion() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_context_never_starts_the_operation() {
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();
        assert!(ctx.is_cancelled());

        let result = ctx.run(async { 7 }).await;
        assert_eq!(result, Err(Interrupted::Cancelled));
    }

    #[tokio::test]
    async fn cancelling_mid_flight_aborts_the_operation() {
        let (ctx, handle) = Context::background().with_cancel();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(result, Err(Interrupted::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn expired_deadline_is_reported() {
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (ctx, handle) = Context::background().with_cancel();
        drop(handle);
        assert_eq!(ctx.run(async { "done" }).await, Ok("done"));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = Context::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
