// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the validated task graph (petgraph).
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and which are blocked by a failure.
//! - [`task_info`] provides task metadata, scheduled task and report types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{RunReport, ScheduledTask, TaskRunState};
