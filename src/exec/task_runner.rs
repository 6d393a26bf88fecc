// src/exec/task_runner.rs

//! Runs a single task action and reports its outcome.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::TaskAction;

/// Run `action` on the blocking pool and emit exactly one `TaskCompleted`.
///
/// A panicking action is reported as a failure of that task.
pub async fn run_task(
    task: ScheduledTask,
    action: Arc<dyn TaskAction>,
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %task.name, run_id = task.run_id, "starting '{}'", task.name);
    let started = Instant::now();

    let result = tokio::task::spawn_blocking(move || action.run(&ctx)).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(Ok(())) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                elapsed_ms,
                "finished '{}'", task.name
            );
            TaskOutcome::Success
        }
        Ok(Err(err)) => {
            error!(
                task = %task.name,
                run_id = task.run_id,
                elapsed_ms,
                error = %err,
                "'{}' errored", task.name
            );
            TaskOutcome::Failed(err.to_string())
        }
        Err(join_err) => {
            error!(
                task = %task.name,
                run_id = task.run_id,
                error = %join_err,
                "'{}' panicked", task.name
            );
            TaskOutcome::Failed(format!("task panicked: {join_err}"))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %task.name, "runtime channel closed before completion was reported");
    }
}
