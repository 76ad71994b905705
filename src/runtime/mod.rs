//! Process-level glue for binaries that embed runners.
//!
//! - [`setup_tracing`] - installs the `RUST_LOG`-filtered log subscriber
//! - [`wait_for_shutdown_signal`] - resolves on SIGINT/SIGTERM/SIGQUIT (Ctrl-C off unix)
//! - [`run_until`] / [`run_until_shutdown_signal`] - drive one service cycle on the
//!   current task until asked to stop

pub mod drive;
pub mod signals;
pub mod tracing;

pub use drive::{run_until, run_until_shutdown_signal};
pub use signals::wait_for_shutdown_signal;
pub use self::tracing::setup_tracing;
