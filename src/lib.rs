#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Service Runner
//!
//! > **Lifecycle-managed runners for long-lived async services.**
//!
//! A runner wraps a long-running operation (a *service body*) with a safe
//! start / observe / stop protocol on top of Tokio.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### One cycle, four states
//!
//! ```text
//! Stopped -> Booting -> Running -> Closing -> Stopped
//! ```
//!
//! - **One cycle in flight**: a second `run()` during a cycle fails with an unexpected-state error.
//! - **Always paired**: `after_running` runs after every `before_running` attempt, even a failed one.
//! - **Graceful drain**: the `Closing` transition waits for the body and every in-flight
//!   `while_running` operation to return. Nothing is preempted.
//! - **Idempotent stop**: any number of concurrent `close_async()` calls fire the shutdown signal once.
//!
//! ### Shared vs. exclusive
//!
//! A reader/writer *phase lock* separates the two kinds of activity:
//!
//! | Activity | Mode |
//! |----------|------|
//! | `before_running`, `after_running`, `bind` | exclusive |
//! | the body (`running`), `while_running` ops, `close_async` | shared |
//!
//! So operations run concurrently with the body, but never observe a half-finished transition.
//!
//! ## 🚀 Core Concepts
//!
//! ### Bodies
//! Implement [`Runnable`] (raw [`Shutdown`] signal) or [`ContextRunnable`]
//! (`CancellationToken`, optionally derived from a parent scope). Only `running` is required.
//!
//! ### Runners
//! [`Runner`] and [`ContextRunner`] are the two front-ends. Both are thin adapters over the
//! same engine and both implement [`Service`].
//!
//! ### Stopping
//! - `close_async()` never waits. It is the only stop call allowed inside the body.
//! - `close()` waits until the cycle is over and returns the `after_running` error, if any.
//!   The body must notice the signal and return; there is no timeout.
//!
//! ## 👩‍💻 Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use service_runner::{Runnable, Runner, RunnerError, Shutdown, State};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Counter {
//!     hits: AtomicU64,
//! }
//!
//! #[async_trait]
//! impl Runnable for Counter {
//!     type Error = std::io::Error;
//!
//!     async fn running(&self, shutdown: Shutdown) -> Result<(), Self::Error> {
//!         shutdown.triggered().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RunnerError> {
//!     let counter = Arc::new(Counter::default());
//!     let runner = Arc::new(Runner::from_arc(counter.clone()).with_name("counter"));
//!
//!     let cycle = tokio::spawn({
//!         let runner = runner.clone();
//!         async move { runner.run().await }
//!     });
//!     while runner.state() != State::Running {
//!         tokio::task::yield_now().await;
//!     }
//!
//!     // Work alongside the body; refused once the runner stops.
//!     runner
//!         .while_running(|_shutdown| async {
//!             counter.hits.fetch_add(1, Ordering::SeqCst);
//!             Ok::<_, RunnerError>(())
//!         })
//!         .await?;
//!
//!     runner.close().await?;
//!     cycle.await.expect("cycle task")?;
//!     assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Runners ([`runner`])
//! The state machine, both front-ends, the shutdown signal and the error types.
//!
//! ### 2. Process Glue ([`runtime`])
//! Tracing setup, OS shutdown signals, and [`run_until`](runtime::run_until) for driving a
//! service from `main`.
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=debug cargo run
//! ```

pub mod runner;
pub mod runtime;

// Re-export core types for convenience
pub use runner::{
    BodyError, ContextRunnable, ContextRunner, Phase, Runnable, Runner, RunnerError, Service,
    Shutdown, State, UnexpectedState,
};
