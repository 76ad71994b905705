//! # Heartbeat Demo
//!
//! A single service, a [`Heartbeat`], bound to a [`Runner`] and driven from `main` until
//! the process receives SIGINT/SIGTERM.
//!
//! A side task probes the service once per second through `while_running`, which shows
//! the probe succeeding while the service runs and being refused once it stops.
//!
//! ```bash
//! RUST_LOG=debug HEARTBEAT_INTERVAL_MS=200 cargo run
//! ```

use async_trait::async_trait;
use service_runner::runtime::{run_until_shutdown_signal, setup_tracing};
use service_runner::{Runnable, Runner, RunnerError, Shutdown};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

const DEFAULT_INTERVAL_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
enum HeartbeatError {
    #[error("heartbeat interval must be positive")]
    ZeroInterval,
}

/// Counts ticks until asked to stop.
struct Heartbeat {
    interval: Duration,
    beats: AtomicU64,
}

impl Heartbeat {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            beats: AtomicU64::new(0),
        }
    }

    fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Runnable for Heartbeat {
    type Error = HeartbeatError;

    async fn before_running(&self, _shutdown: Shutdown) -> Result<(), HeartbeatError> {
        if self.interval.is_zero() {
            return Err(HeartbeatError::ZeroInterval);
        }
        info!(interval_ms = self.interval.as_millis() as u64, "heartbeat starting");
        Ok(())
    }

    async fn running(&self, shutdown: Shutdown) -> Result<(), HeartbeatError> {
        let mut ticks = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    let n = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(beat = n, "tick");
                }
                _ = shutdown.triggered() => break,
            }
        }
        Ok(())
    }

    async fn after_running(&self) -> Result<(), HeartbeatError> {
        info!(beats = self.beats(), "heartbeat stopped");
        Ok(())
    }
}

fn interval_from_env() -> Duration {
    let ms = match std::env::var("HEARTBEAT_INTERVAL_MS") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid HEARTBEAT_INTERVAL_MS, using default");
            DEFAULT_INTERVAL_MS
        }),
        Err(_) => DEFAULT_INTERVAL_MS,
    };
    Duration::from_millis(ms)
}

#[tokio::main]
async fn main() -> Result<(), RunnerError> {
    setup_tracing();

    let heartbeat = Arc::new(Heartbeat::new(interval_from_env()));
    let runner = Arc::new(Runner::from_arc(heartbeat.clone()).with_name("heartbeat"));

    let probe = tokio::spawn({
        let runner = runner.clone();
        async move {
            let mut every = tokio::time::interval(Duration::from_secs(1));
            every.tick().await;
            loop {
                every.tick().await;
                let seen = runner
                    .while_running(|_shutdown| async { Ok::<_, RunnerError>(heartbeat.beats()) })
                    .await;
                match seen {
                    Ok(beats) => info!(beats, "probe"),
                    Err(e) => {
                        info!(error = %e, "probe refused, stopping");
                        break;
                    }
                }
            }
        }
        .instrument(tracing::info_span!("probe"))
    });

    info!("running until SIGINT/SIGTERM");
    let result = run_until_shutdown_signal(runner.as_ref()).await;

    probe.abort();
    if let Err(e) = &result {
        warn!(error = %e, "heartbeat ended with error");
    }
    result
}
