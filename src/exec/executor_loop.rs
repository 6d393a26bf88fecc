// src/exec/executor_loop.rs

//! Main executor loop that hands scheduled tasks to their actions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::task_runner::run_task;
use crate::tasks::TaskRegistry;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// forwards scheduled tasks into. Every task runs in its own Tokio task, so
/// tasks dispatched together run concurrently. The scheduler never dispatches
/// a task that is still running, so no per-name bookkeeping is needed here.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    registry: Arc<TaskRegistry>,
    ctx: Arc<BuildContext>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(task) = rx.recv().await {
            handle_scheduled_task(task, &registry, &ctx, &runtime_tx).await;
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn handle_scheduled_task(
    task: ScheduledTask,
    registry: &TaskRegistry,
    ctx: &Arc<BuildContext>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let Some(action) = registry.action(&task.name) else {
        warn!(task = %task.name, run_id = task.run_id, "no action registered for task");
        let _ = runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                task: task.name.clone(),
                outcome: TaskOutcome::Failed(format!("no action registered for '{}'", task.name)),
            })
            .await;
        return;
    };

    let rt_tx = runtime_tx.clone();
    let ctx = Arc::clone(ctx);
    tokio::spawn(run_task(task, action, ctx, rt_tx));
}
