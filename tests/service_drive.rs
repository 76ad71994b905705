use async_trait::async_trait;
use service_runner::runtime::run_until;
use service_runner::{
    ContextRunnable, ContextRunner, Phase, Runnable, Runner, RunnerError, Service, Shutdown, State,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
#[error("worker failed")]
struct WorkerError;

struct Worker {
    boot_delay: Duration,
}

#[async_trait]
impl Runnable for Worker {
    type Error = WorkerError;

    async fn before_running(&self, _shutdown: Shutdown) -> Result<(), WorkerError> {
        tokio::time::sleep(self.boot_delay).await;
        Ok(())
    }

    async fn running(&self, shutdown: Shutdown) -> Result<(), WorkerError> {
        shutdown.triggered().await;
        Ok(())
    }
}

struct ScopedWorker;

#[async_trait]
impl ContextRunnable for ScopedWorker {
    type Error = WorkerError;

    async fn running(&self, scope: CancellationToken) -> Result<(), WorkerError> {
        scope.cancelled().await;
        Err(WorkerError)
    }
}

/// Finishes on its own without waiting for shutdown.
struct OneShot;

#[async_trait]
impl Runnable for OneShot {
    type Error = WorkerError;

    async fn running(&self, _shutdown: Shutdown) -> Result<(), WorkerError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_run_until_stops_on_request() {
    let runner = Runner::new(Worker {
        boot_delay: Duration::ZERO,
    });
    let (stop, stopped) = oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = stop.send(());
    });

    run_until(&runner, async {
        let _ = stopped.await;
    })
    .await
    .unwrap();
    assert_eq!(runner.state(), State::Stopped);
}

#[tokio::test]
async fn test_run_until_stop_during_boot() {
    let runner = Runner::new(Worker {
        boot_delay: Duration::from_millis(30),
    });

    // The stop request is ready before the boot phase completes.
    run_until(&runner, async {}).await.unwrap();
    assert_eq!(runner.state(), State::Stopped);
}

#[tokio::test]
async fn test_run_until_returns_when_cycle_ends_first() {
    let runner = Runner::new(OneShot);

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        run_until(&runner, std::future::pending::<()>()),
    )
    .await
    .expect("cycle should end without a stop request");
    result.unwrap();
}

#[tokio::test]
async fn test_services_behind_dyn() {
    let services: Vec<Arc<dyn Service>> = vec![
        Arc::new(
            Runner::new(Worker {
                boot_delay: Duration::ZERO,
            })
            .with_name("worker"),
        ),
        Arc::new(ContextRunner::new(ScopedWorker).with_name("scoped")),
    ];

    let names: Vec<&str> = services.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["worker", "scoped"]);

    let cycles: Vec<_> = services
        .iter()
        .map(|service| {
            let service = service.clone();
            tokio::spawn(async move { service.run().await })
        })
        .collect();

    for service in &services {
        tokio::time::timeout(Duration::from_secs(2), async {
            while service.state() != State::Running {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("service should start");
    }

    for service in &services {
        service.close().await.unwrap();
        assert_eq!(service.state(), State::Stopped);
    }

    let results: Vec<Result<(), RunnerError>> = join_cycles(cycles).await;
    assert!(results[0].is_ok());
    assert_eq!(
        results[1].as_ref().unwrap_err().failed_phase(),
        Some(Phase::Running)
    );
}

async fn join_cycles(
    cycles: Vec<tokio::task::JoinHandle<Result<(), RunnerError>>>,
) -> Vec<Result<(), RunnerError>> {
    let mut results = Vec::with_capacity(cycles.len());
    for cycle in cycles {
        results.push(cycle.await.expect("cycle task panicked"));
    }
    results
}

/// A service whose cycle refuses to be stopped for its first 20ms.
struct SlowToArm {
    created: std::time::Instant,
    attempts: std::sync::atomic::AtomicUsize,
    stop: tokio::sync::Notify,
}

#[async_trait]
impl Service for SlowToArm {
    fn name(&self) -> &str {
        "slow-to-arm"
    }

    fn state(&self) -> State {
        State::Stopped
    }

    async fn run(&self) -> Result<(), RunnerError> {
        self.stop.notified().await;
        Ok(())
    }

    fn close_async(&self) -> Result<(), RunnerError> {
        self.attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.created.elapsed() < Duration::from_millis(20) {
            return Err(RunnerError::unexpected_state(State::Stopped));
        }
        self.stop.notify_one();
        Ok(())
    }

    async fn close(&self) -> Result<(), RunnerError> {
        self.close_async()
    }
}

#[tokio::test]
async fn test_run_until_backs_off_while_stop_is_refused() {
    let service = SlowToArm {
        created: std::time::Instant::now(),
        attempts: std::sync::atomic::AtomicUsize::new(0),
        stop: tokio::sync::Notify::new(),
    };

    run_until(&service, async {}).await.unwrap();

    let attempts = service.attempts.load(std::sync::atomic::Ordering::SeqCst);
    assert!(attempts >= 2, "stop was never retried");
    assert!(attempts < 100, "stop retried {attempts} times in 20ms");
}
