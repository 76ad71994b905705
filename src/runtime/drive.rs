//! # Driving a Service to Completion
//!
//! A process entry point typically runs one service until something outside asks it to
//! stop. [`run_until`] does that on the current task.
//!
//! The stop request goes through `close_async`, never `close`: `close` waits for the cycle
//! to end, but the cycle is only making progress because this same task is polling it.

use crate::runner::{RunnerError, Service};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const RETRY_STOP_AFTER: Duration = Duration::from_millis(1);

/// Runs one cycle of `service`, asking it to stop once `stop` resolves.
///
/// Returns the cycle's result. If the cycle ends on its own first, `stop` is dropped.
pub async fn run_until<S, F>(service: &S, stop: F) -> Result<(), RunnerError>
where
    S: Service + ?Sized,
    F: Future<Output = ()>,
{
    let cycle = service.run();
    tokio::pin!(cycle);

    tokio::select! {
        biased;
        result = &mut cycle => return result,
        () = stop => {}
    }

    // A cycle that has not booted yet cannot be stopped; keep polling it until it can.
    // It may be queued behind another caller's cycle for as long as that one runs.
    while let Err(e) = service.close_async() {
        debug!(runner = %service.name(), error = %e, "stop deferred until the cycle boots");
        tokio::select! {
            biased;
            result = &mut cycle => return result,
            () = tokio::time::sleep(RETRY_STOP_AFTER) => {}
        }
    }
    info!(runner = %service.name(), "stop requested");

    cycle.await
}

/// [`run_until`] the process receives a termination signal.
///
/// If the signal listener cannot be installed the service is stopped right away rather
/// than left running with no way to stop it.
pub async fn run_until_shutdown_signal<S>(service: &S) -> Result<(), RunnerError>
where
    S: Service + ?Sized,
{
    run_until(service, async {
        if let Err(e) = super::signals::wait_for_shutdown_signal().await {
            warn!(runner = %service.name(), error = %e, "cannot listen for shutdown signals");
        }
    })
    .await
}
