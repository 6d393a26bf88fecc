// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use crate::dag::{RunReport, ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// A run has ended; every participating task is terminal.
    RunFinished(RunReport),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    /// The report of the run that finished during this step, if any.
    pub fn finished_run(&self) -> Option<&RunReport> {
        self.commands.iter().find_map(|c| match c {
            CoreCommand::RunFinished(report) => Some(report),
            CoreCommand::DispatchTasks(_) => None,
        })
    }
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, start a new run seeded with this trigger plus
///   the oldest queued batch.
/// - If a run is active:
///   - a task that is not yet in the run is merged into it immediately;
///   - a task already participating is handed to the queue, so it runs again
///     once the active run is over.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    tracing::debug!(task = %task, ?reason, "handling trigger");

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.next_run().into_iter().collect();
        triggers.insert(task);
        return start_new_run_from_triggers(scheduler, triggers.into_iter().collect());
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => {
            tracing::warn!(task = %task, "trigger for unknown task; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let step = scheduler.step_trigger(&task);
            push_step(&mut commands, step);
            commands.extend(maybe_start_queued_run(scheduler, queue));
        }
        Some(_already_in_run) => {
            queue.record_trigger(&task);
        }
    }

    CoreStep::running(commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.step_completion(&task, outcome);
    push_step(&mut commands, step);

    commands.extend(maybe_start_queued_run(scheduler, queue));

    CoreStep::running(commands)
}

/// Seed a new run from a set of root triggers.
pub fn start_new_run_from_triggers(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> CoreStep {
    let mut commands = Vec::new();

    if triggers.is_empty() {
        return CoreStep::running(commands);
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    let mut finished = None;
    for task in triggers {
        let step = scheduler.step_trigger(&task);
        all_ready.extend(step.newly_scheduled);
        finished = finished.or(step.finished);
    }

    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }
    if let Some(report) = finished {
        commands.push(CoreCommand::RunFinished(report));
    }

    CoreStep::running(commands)
}

fn push_step(commands: &mut Vec<CoreCommand>, step: SchedulerStep) {
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    if let Some(report) = step.finished {
        commands.push(CoreCommand::RunFinished(report));
    }
}

/// If the scheduler is idle and a batch is queued, start a run from it.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers = queue.next_run();
    if triggers.is_empty() {
        return Vec::new();
    }

    start_new_run_from_triggers(scheduler, triggers).commands
}
