//! # Service Trait
//!
//! Both runner flavours expose the same start/stop surface. [`Service`] names it, so code
//! that only starts and stops things (a process entry point, a supervisor) can hold any
//! runner as `Arc<dyn Service>`.

use super::channel::{Runnable, Runner};
use super::context::{ContextRunnable, ContextRunner};
use super::error::RunnerError;
use super::state::State;
use async_trait::async_trait;

/// The start/stop surface of a lifecycle-managed runner.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> State;

    /// Runs one full cycle.
    async fn run(&self) -> Result<(), RunnerError>;

    /// Requests shutdown without waiting.
    fn close_async(&self) -> Result<(), RunnerError>;

    /// Requests shutdown and waits for the cycle to end.
    async fn close(&self) -> Result<(), RunnerError>;
}

#[async_trait]
impl<R: Runnable> Service for Runner<R> {
    fn name(&self) -> &str {
        Runner::name(self)
    }

    fn state(&self) -> State {
        Runner::state(self)
    }

    async fn run(&self) -> Result<(), RunnerError> {
        Runner::run(self).await
    }

    fn close_async(&self) -> Result<(), RunnerError> {
        Runner::close_async(self)
    }

    async fn close(&self) -> Result<(), RunnerError> {
        Runner::close(self).await
    }
}

#[async_trait]
impl<R: ContextRunnable> Service for ContextRunner<R> {
    fn name(&self) -> &str {
        ContextRunner::name(self)
    }

    fn state(&self) -> State {
        ContextRunner::state(self)
    }

    async fn run(&self) -> Result<(), RunnerError> {
        ContextRunner::run(self).await
    }

    fn close_async(&self) -> Result<(), RunnerError> {
        ContextRunner::close_async(self)
    }

    async fn close(&self) -> Result<(), RunnerError> {
        ContextRunner::close(self).await
    }
}
