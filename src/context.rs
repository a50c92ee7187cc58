//! Cancellable execution context for client calls

use crate::error::{EmbeddingsError, Operation, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Execution context handed to every client operation
///
/// A context is cancelled when [`CallContext::cancel`] is called on it or on
/// any of its ancestors, or when its deadline passes. Clones share the same
/// cancellation state.
#[derive(Clone)]
pub struct CallContext {
    // Ancestors first, own token last.
    tokens: Vec<Arc<CancelToken>>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Create a root context with no deadline
    pub fn new() -> Self {
        Self {
            tokens: vec![CancelToken::new()],
            deadline: None,
        }
    }

    /// Derive a context that is cancelled together with this one but can
    /// also be cancelled on its own
    pub fn child(&self) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(CancelToken::new());
        Self {
            tokens,
            deadline: self.deadline,
        }
    }

    /// Derive a child context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut child = self.child();
        let deadline = Instant::now() + timeout;
        child.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        child
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        debug!("Call context cancelled");
        if let Some(own) = self.tokens.last() {
            own.cancel();
        }
    }

    /// Check whether the context is cancelled or past its deadline
    pub fn is_cancelled(&self) -> bool {
        self.tokens.iter().any(|t| t.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Remaining time before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Wait until the context is cancelled
    pub async fn cancelled(&self) {
        // Register waiters before checking the flags so a concurrent cancel
        // between the check and the await is not lost.
        let waits: Vec<_> = self
            .tokens
            .iter()
            .map(|t| Box::pin(t.notify.notified()))
            .collect();

        if self.is_cancelled() {
            return;
        }

        let any_token = futures::future::select_all(waits);

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = any_token => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => {
                any_token.await;
            }
        }
    }

    /// Run `fut` unless the context is cancelled first
    ///
    /// An already-cancelled context returns `Cancelled` without polling `fut`.
    pub async fn run<F, T>(&self, operation: Operation, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(EmbeddingsError::Cancelled(operation));
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => {
                warn!("Cancelled in-flight {} request", operation);
                Err(EmbeddingsError::Cancelled(operation))
            }
            result = fut => result,
        }
    }

    /// Cancel this context when the process receives Ctrl+C or SIGTERM
    pub fn cancel_on_shutdown_signal(&self) -> JoinHandle<()> {
        let ctx = self.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sig) => {
                        sig.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C signal");
                }
                _ = terminate => {
                    info!("Received SIGTERM signal");
                }
                _ = ctx.cancelled() => {
                    return;
                }
            }

            ctx.cancel();
        })
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("depth", &self.tokens.len())
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_propagates_to_children() {
        let parent = CallContext::new();
        let child = parent.child();
        let sibling = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());

        parent.cancel();
        assert!(sibling.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let ctx = CallContext::new();
        let waiter = ctx.child();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });

        tokio::task::yield_now().await;
        ctx.cancel();

        let woke = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("waiter did not wake")
            .unwrap();
        assert!(woke);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_expires() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());

        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_run_skips_future_when_already_cancelled() {
        let ctx = CallContext::new();
        ctx.cancel();

        let polled = Arc::new(AtomicBool::new(false));
        let flag = polled.clone();
        let result: Result<()> = ctx
            .run(Operation::Text, async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(EmbeddingsError::Cancelled(Operation::Text))));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_aborts_in_flight_call() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));

        let result: Result<()> = ctx
            .run(Operation::Image, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(EmbeddingsError::Cancelled(Operation::Image))));
    }
}
