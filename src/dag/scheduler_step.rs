// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::{RunReport, ScheduledTask};
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the DAG and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Task that was newly marked as failed in this step.
    pub newly_failed: Vec<TaskName>,
    /// Dependents of the failed task that will not run in this run.
    pub newly_blocked: Vec<TaskName>,
    /// Set when this step finished the current run (the scheduler is now idle).
    pub finished: Option<RunReport>,
}
