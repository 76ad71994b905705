//! Lifecycle-managed runners.
//!
//! A runner wraps a long-running service body with a start/observe/stop protocol:
//!
//! - one run-cycle in flight at a time, moving `Stopped -> Booting -> Running -> Closing -> Stopped`;
//! - any number of [`while_running`](Runner::while_running) operations alongside the body,
//!   none of which can overlap a state transition;
//! - an idempotent, non-blocking [`close_async`](Runner::close_async) and a blocking
//!   [`close`](Runner::close) that waits for the cycle to drain.
//!
//! # Main Components
//!
//! - [`Runner`] / [`Runnable`] - bodies that observe a raw [`Shutdown`] signal
//! - [`ContextRunner`] / [`ContextRunnable`] - bodies that observe a `CancellationToken`
//! - [`Service`] - the start/stop surface shared by both
//! - [`State`], [`RunnerError`] - what callers inspect
//!
//! Both runners are thin adapters over one crate-private engine.

pub mod channel;
pub mod context;
mod engine;
pub mod error;
pub mod service;
pub mod signal;
pub mod state;

pub use channel::{Runnable, Runner};
pub use context::{ContextRunnable, ContextRunner};
pub use error::{BodyError, Phase, RunnerError, UnexpectedState};
pub use service::Service;
pub use signal::Shutdown;
pub use state::State;
