// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - pulling the predecessors of a triggered task into the run
/// - deciding when a task is ready (all predecessors succeeded)
/// - blocking dependents when a task fails
/// - producing a [`RunReport`](crate::dag::RunReport) when the run ends
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn new(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let info = TaskInfo::new(name.to_string(), graph.dependencies_of(name));
                (name.to_string(), info)
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks that are participating in the *active* run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the predecessors of `task` are satisfied for the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Start a new run, resetting per-run state but keeping history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new DAG run");
    }

    /// Include `task` (and its predecessors) in the current run and return
    /// whatever became ready.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        if self.current_run_id.is_none() {
            warn!(
                task = %task,
                "trigger with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        let mut newly_blocked = Vec::new();
        if self.tasks.contains_key(task) {
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
            newly_blocked = manager.mark_task_and_predecessors_pending(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let newly_scheduled = manager.collect_new_ready_tasks();

        SchedulerStep {
            newly_scheduled,
            newly_blocked,
            finished: self.maybe_finish_run(),
            ..SchedulerStep::default()
        }
    }

    /// Record the outcome of a running task.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };

        if info.run_state != Some(RunState::Running) {
            warn!(
                task = %task,
                run_id,
                state = ?info.run_state,
                "completion for a task that is not running; ignoring"
            );
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                info.last_successful_run = Some(run_id);
                info.last_error = None;
                debug!(task = %info.name, run_id, "task completed successfully");
                let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                step.newly_scheduled = manager.collect_new_ready_tasks();
            }
            TaskOutcome::Failed(error) => {
                info.run_state = Some(RunState::DoneFailed);
                info.last_failed_run = Some(run_id);
                warn!(
                    task = %info.name,
                    run_id,
                    %error,
                    "task failed; blocking dependents in this run"
                );
                info.last_error = Some(error);
                step.newly_failed.push(info.name.clone());
                let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                step.newly_blocked = manager.mark_dependents_blocked(task);
            }
        }

        step.finished = self.maybe_finish_run();
        step
    }

    /// If every participating task is terminal, close the run and return its
    /// report.
    fn maybe_finish_run(&mut self) -> Option<crate::dag::RunReport> {
        self.current_run_id?;

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if !manager.all_tasks_terminal() {
            return None;
        }

        let report = manager.report();
        info!(
            run_id = report.run_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            blocked = report.blocked.len(),
            "scheduler: all tasks terminal; run finished"
        );
        self.current_run_id = None;
        Some(report)
    }
}
