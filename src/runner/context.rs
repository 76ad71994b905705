//! # Scope-Flavoured Runner
//!
//! [`ContextRunner`] runs the same state machine as [`Runner`](super::Runner), but its
//! body works with a [`CancellationToken`] instead of a raw signal. Each cycle's token is a
//! child of an optional parent, so cancelling the parent stops the cycle too.
//!
//! ```rust
//! use service_runner::{ContextRunnable, ContextRunner};
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Poller;
//!
//! #[async_trait]
//! impl ContextRunnable for Poller {
//!     type Error = std::io::Error;
//!
//!     async fn running(&self, scope: CancellationToken) -> Result<(), std::io::Error> {
//!         scope.cancelled().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let root = CancellationToken::new();
//!     let runner = ContextRunner::new(Poller).with_parent(root.clone());
//!
//!     // Cancelling the application root ends the cycle.
//!     root.cancel();
//!     runner.run().await.unwrap();
//! }
//! ```

use super::channel::default_name;
use super::engine::{Engine, Hooks};
use super::error::{Phase, RunnerError};
use super::state::State;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A service body driven by a [`ContextRunner`].
///
/// Same contract as [`Runnable`](super::Runnable), with the cycle's cancellation scope in
/// place of the shutdown signal.
#[async_trait]
pub trait ContextRunnable: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn before_running(&self, _scope: CancellationToken) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn running(&self, scope: CancellationToken) -> Result<(), Self::Error>;

    async fn after_running(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub(crate) struct ScopeBound<R> {
    parent: Option<CancellationToken>,
    body: Arc<R>,
}

#[async_trait]
impl<R: ContextRunnable> Hooks for ScopeBound<R> {
    type Signal = CancellationToken;

    fn prepare(&self) -> CancellationToken {
        self.parent
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default()
    }

    async fn boot(&self, scope: CancellationToken) -> Result<(), RunnerError> {
        self.body
            .before_running(scope)
            .await
            .map_err(|e| RunnerError::phase(Phase::BeforeRunning, e))
    }

    async fn run(&self, scope: CancellationToken) -> Result<(), RunnerError> {
        self.body
            .running(scope)
            .await
            .map_err(|e| RunnerError::phase(Phase::Running, e))
    }

    async fn close(&self) -> Result<(), RunnerError> {
        self.body
            .after_running()
            .await
            .map_err(|e| RunnerError::phase(Phase::AfterRunning, e))
    }
}

/// Lifecycle-managed runner for a [`ContextRunnable`] body.
pub struct ContextRunner<R: ContextRunnable> {
    engine: Engine<ScopeBound<R>>,
    parent: Option<CancellationToken>,
}

impl<R: ContextRunnable> ContextRunner<R> {
    /// Creates a stopped runner bound to `runnable`, with no parent scope.
    pub fn new(runnable: R) -> Self {
        Self::from_arc(Arc::new(runnable))
    }

    /// Creates a stopped runner bound to a body the caller keeps a handle to.
    pub fn from_arc(runnable: Arc<R>) -> Self {
        let bound = ScopeBound {
            parent: None,
            body: runnable,
        };
        Self {
            engine: Engine::new(default_name::<R>(), Some(bound)),
            parent: None,
        }
    }

    /// Derives every cycle's scope from `parent`.
    ///
    /// On an unbound runner the parent is kept for the body a later [`bind`](Self::bind)
    /// supplies without a parent of its own.
    pub fn with_parent(mut self, parent: CancellationToken) -> Self {
        if let Some(bound) = self.engine.hooks_mut() {
            bound.parent = Some(parent.clone());
        }
        self.parent = Some(parent);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.engine.set_name(name);
        self
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Rebinds the runner to another body and parent scope. Fails unless stopped.
    ///
    /// With `parent` left `None`, the scope set by [`with_parent`](Self::with_parent), if
    /// any, is used.
    pub async fn bind(
        &self,
        parent: Option<CancellationToken>,
        runnable: Arc<R>,
    ) -> Result<(), RunnerError> {
        let bound = ScopeBound {
            parent: parent.or_else(|| self.parent.clone()),
            body: runnable,
        };
        self.engine.bind(bound).await
    }

    pub fn state(&self) -> State {
        self.engine.state()
    }

    /// Runs one full cycle. Resolves once `after_running` has returned.
    pub async fn run(&self) -> Result<(), RunnerError> {
        self.engine.run().await
    }

    /// Runs `op` if the runner is `Running` and its scope is still live.
    ///
    /// Fails with [`RunnerError::ShuttingDown`] once the scope has been cancelled, whether
    /// by `close_async` or by the parent.
    pub async fn while_running<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RunnerError>,
    {
        self.engine
            .while_running(|scope| async move {
                if scope.is_cancelled() {
                    return Err(RunnerError::ShuttingDown.into());
                }
                op(scope).await
            })
            .await
    }

    /// Cancels the current cycle's scope and returns at once.
    pub fn close_async(&self) -> Result<(), RunnerError> {
        self.engine.close_async()
    }

    /// Cancels the current cycle's scope and waits until the cycle is over.
    ///
    /// Calling this from the body or from `while_running` deadlocks.
    pub async fn close(&self) -> Result<(), RunnerError> {
        self.engine.close().await
    }
}

impl<R: ContextRunnable> Default for ContextRunner<R> {
    fn default() -> Self {
        Self {
            engine: Engine::new(default_name::<R>(), None),
            parent: None,
        }
    }
}
