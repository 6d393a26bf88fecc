// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! task actions.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    CoreStep, handle_task_completion, handle_task_trigger, start_new_run_from_triggers,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, TaskName};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// Owns the DAG scheduler and the trigger queue. It has **no** channels, no
/// Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start one sequence group: a single run seeded with all `targets`.
    ///
    /// When a run is already active the targets are handled like ordinary
    /// triggers.
    pub fn start_group(&mut self, targets: &[TaskName]) -> CoreStep {
        if self.scheduler.is_idle() {
            return start_new_run_from_triggers(&mut self.scheduler, targets.to_vec());
        }

        let mut commands = Vec::new();
        for task in targets {
            let step = handle_task_trigger(
                &mut self.scheduler,
                &mut self.queue,
                task.clone(),
                crate::engine::TriggerReason::Manual,
            );
            commands.extend(step.commands);
        }
        CoreStep {
            commands,
            keep_running: true,
        }
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.scheduler, &mut self.queue, task, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
