//! # Shutdown Signals
//!
//! Each run-cycle gets a fresh one-shot shutdown signal. The engine fires it at most once
//! per cycle; once fired it stays fired until the next cycle replaces it.
//!
//! Two flavours exist, one per front-end:
//!
//! - [`Shutdown`] for [`Runner`](super::Runner): a raw broadcast flag the body can poll
//!   or await.
//! - [`CancellationToken`] for [`ContextRunner`](super::ContextRunner): a structured
//!   scope that can be derived from a caller-supplied parent.
//!
//! The engine only needs to create, fire and inspect a handle, which is what
//! `ShutdownHandle` captures.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// The capability the engine needs from a per-cycle cancellation handle.
///
/// `Default` must produce a fresh, untriggered handle.
pub(crate) trait ShutdownHandle: Clone + Default + Send + Sync + 'static {
    fn trigger(&self);
    fn is_triggered(&self) -> bool;
}

/// One-shot shutdown broadcast handed to a [`Runnable`](super::Runnable) body.
///
/// All clones observe the same signal. Only the runner can fire it.
///
/// ```rust
/// # async fn body(shutdown: service_runner::Shutdown) {
/// let mut ticks = tokio::time::interval(std::time::Duration::from_millis(100));
/// loop {
///     tokio::select! {
///         _ = ticks.tick() => { /* work */ }
///         _ = shutdown.triggered() => break,
///     }
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves when shutdown is requested, immediately if it already was.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so the wait can only end by the flag flipping.
        let _ = receiver.wait_for(|fired| *fired).await;
    }

    pub(crate) fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

impl ShutdownHandle for Shutdown {
    fn trigger(&self) {
        Shutdown::trigger(self);
    }

    fn is_triggered(&self) -> bool {
        Shutdown::is_triggered(self)
    }
}

impl ShutdownHandle for CancellationToken {
    fn trigger(&self) {
        self.cancel();
    }

    fn is_triggered(&self) -> bool {
        self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_clone() {
        let shutdown = Shutdown::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let s = shutdown.clone();
                tokio::spawn(async move { s.triggered().await })
            })
            .collect();

        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_triggered_is_sticky() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        // A late waiter must not block.
        tokio::time::timeout(Duration::from_millis(50), shutdown.triggered())
            .await
            .expect("already fired");
    }

    #[test]
    fn test_default_handles_are_fresh() {
        let a = <Shutdown as Default>::default();
        ShutdownHandle::trigger(&a);
        let b = <Shutdown as Default>::default();
        assert!(!ShutdownHandle::is_triggered(&b));

        let token = CancellationToken::default();
        ShutdownHandle::trigger(&token);
        assert!(token.is_cancelled());
    }
}
