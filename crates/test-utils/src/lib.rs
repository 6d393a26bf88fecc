pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Once};

use assetdag::context::BuildContext;
use assetdag::dag::{RunReport, Scheduler};
use assetdag::engine::{CoreRuntime, Runtime, RuntimeEvent, TaskName};
use assetdag::exec::RealExecutorBackend;
use assetdag::tasks::TaskRegistry;
use assetdag::types::TriggerWhileRunningBehaviour;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Run `groups` through the real executor with `registry` and `ctx`, the way
/// the CLI does, and return the reports.
pub async fn run_groups(
    registry: TaskRegistry,
    ctx: BuildContext,
    groups: &[Vec<TaskName>],
) -> Vec<RunReport> {
    let graph = registry.graph().expect("registry graph is valid");
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(tx, Arc::new(registry), Arc::new(ctx));
    let core = CoreRuntime::new(
        Scheduler::new(graph),
        TriggerWhileRunningBehaviour::Queue,
        1,
    );
    let mut runtime = Runtime::new(core, rx, executor);

    runtime
        .run_sequence(groups)
        .await
        .expect("sequence runs to completion")
}
