//! # Observability & Tracing
//!
//! The runners log through `tracing`; this module installs a subscriber for binaries that
//! embed them. Library code never installs one itself.
//!
//! ## What Gets Traced
//!
//! Every record carries a `runner` field with the runner's name (see `Runner::with_name`).
//!
//! - **info**: run-cycle started / finished
//! - **debug**: each transition (`running`, `closing`), binding, the first shutdown request
//! - **warn**: a cycle finished with an error, or was abandoned before `after_running`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Cycle boundaries only
//! RUST_LOG=info cargo run
//!
//! # Every transition
//! RUST_LOG=service_runner=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` a full cycle reads:
//!
//! ```text
//! INFO run-cycle started runner="Heartbeat"
//! DEBUG running runner="Heartbeat" booted=true
//! DEBUG shutdown requested runner="Heartbeat" state=running
//! DEBUG closing runner="Heartbeat"
//! INFO run-cycle finished runner="Heartbeat"
//! ```

/// Initializes a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // the `runner` field already says where a record came from
        .compact()
        .init();
}
