//! # Signal-Flavoured Runner
//!
//! [`Runner`] binds a [`Runnable`] body to the shared engine. Every phase that may need to
//! stop early receives the cycle's [`Shutdown`] signal.
//!
//! ```rust
//! use service_runner::{Runnable, Runner, Shutdown};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("echo failed")]
//! struct EchoError;
//!
//! #[async_trait]
//! impl Runnable for Echo {
//!     type Error = EchoError;
//!
//!     async fn running(&self, shutdown: Shutdown) -> Result<(), EchoError> {
//!         shutdown.triggered().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Arc::new(Runner::new(Echo));
//!     let cycle = tokio::spawn({
//!         let runner = runner.clone();
//!         async move { runner.run().await }
//!     });
//!
//!     while runner.state() != service_runner::State::Running {
//!         tokio::task::yield_now().await;
//!     }
//!     runner.close().await.unwrap();
//!     cycle.await.unwrap().unwrap();
//! }
//! ```

use super::engine::{Engine, Hooks};
use super::error::{Phase, RunnerError};
use super::signal::Shutdown;
use super::state::State;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// A service body driven by a [`Runner`].
///
/// Only [`Runnable::running`] is required; the other two phases default to doing nothing.
///
/// `running` must return promptly once `shutdown` fires. The runner never times it out,
/// so a body that ignores the signal makes `close()` wait forever.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Initialization. Runs with the phase lock held exclusively.
    async fn before_running(&self, _shutdown: Shutdown) -> Result<(), Self::Error> {
        Ok(())
    }

    /// The body. Runs concurrently with `while_running` operations.
    async fn running(&self, shutdown: Shutdown) -> Result<(), Self::Error>;

    /// Cleanup. Always runs after a `before_running` attempt, even a failed one.
    async fn after_running(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub(crate) struct Bound<R>(Arc<R>);

#[async_trait]
impl<R: Runnable> Hooks for Bound<R> {
    type Signal = Shutdown;

    fn prepare(&self) -> Shutdown {
        Shutdown::new()
    }

    async fn boot(&self, signal: Shutdown) -> Result<(), RunnerError> {
        self.0
            .before_running(signal)
            .await
            .map_err(|e| RunnerError::phase(Phase::BeforeRunning, e))
    }

    async fn run(&self, signal: Shutdown) -> Result<(), RunnerError> {
        self.0
            .running(signal)
            .await
            .map_err(|e| RunnerError::phase(Phase::Running, e))
    }

    async fn close(&self) -> Result<(), RunnerError> {
        self.0
            .after_running()
            .await
            .map_err(|e| RunnerError::phase(Phase::AfterRunning, e))
    }
}

/// Lifecycle-managed runner for a [`Runnable`] body.
///
/// Share it behind an `Arc`: one task drives [`run`](Runner::run), any other task may call
/// [`close_async`](Runner::close_async), [`close`](Runner::close) or
/// [`while_running`](Runner::while_running).
pub struct Runner<R: Runnable> {
    engine: Engine<Bound<R>>,
}

impl<R: Runnable> Runner<R> {
    /// Creates a stopped runner bound to `runnable`.
    pub fn new(runnable: R) -> Self {
        Self::from_arc(Arc::new(runnable))
    }

    /// Creates a stopped runner bound to a body the caller keeps a handle to.
    pub fn from_arc(runnable: Arc<R>) -> Self {
        Self {
            engine: Engine::new(default_name::<R>(), Some(Bound(runnable))),
        }
    }

    /// Sets the name used in log records.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.engine.set_name(name);
        self
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Rebinds the runner to another body. Fails unless stopped.
    pub async fn bind(&self, runnable: Arc<R>) -> Result<(), RunnerError> {
        self.engine.bind(Bound(runnable)).await
    }

    pub fn state(&self) -> State {
        self.engine.state()
    }

    /// Runs one full cycle. Resolves once `after_running` has returned.
    pub async fn run(&self) -> Result<(), RunnerError> {
        self.engine.run().await
    }

    /// Runs `op` if the runner is `Running`. The operation gets the shutdown signal so it
    /// can race its own work against cancellation, and shutdown will not complete until
    /// it returns.
    pub async fn while_running<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(Shutdown) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RunnerError>,
    {
        self.engine.while_running(op).await
    }

    /// Asks the body to stop and returns at once.
    pub fn close_async(&self) -> Result<(), RunnerError> {
        self.engine.close_async()
    }

    /// Asks the body to stop and waits until the cycle is over, returning the
    /// `after_running` error, if any.
    ///
    /// Calling this from the body or from `while_running` deadlocks; use
    /// [`close_async`](Runner::close_async) there.
    pub async fn close(&self) -> Result<(), RunnerError> {
        self.engine.close().await
    }
}

impl<R: Runnable> Default for Runner<R> {
    /// A runner with no body: `run()` completes an empty cycle immediately.
    fn default() -> Self {
        Self {
            engine: Engine::new(default_name::<R>(), None),
        }
    }
}

/// Short type name of the body, e.g. `Heartbeat` rather than `my_app::svc::Heartbeat`.
/// Generic arguments are dropped: `Wrap<app::Inner>` is named `Wrap`.
pub(crate) fn default_name<R: ?Sized>() -> String {
    let full = std::any::type_name::<R>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or("runner").to_string()
}
