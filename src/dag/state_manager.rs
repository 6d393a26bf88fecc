// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunReport, RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered task and all its transitive predecessors in this run.
    ///
    /// - Tasks that were not yet part of the run (`run_state == None`) are
    ///   marked `Pending`, or `Blocked` when a predecessor already failed or
    ///   was blocked in this run.
    /// - Tasks already participating in this run keep their current state.
    ///
    /// Returns the tasks that joined the run as `Blocked`.
    pub fn mark_task_and_predecessors_pending(&mut self, root: &str) -> Vec<TaskName> {
        let mut joined = Vec::new();
        for name in self.graph.with_predecessors(root) {
            match self.tasks.get_mut(&name) {
                Some(info) => {
                    if info.run_state.is_none() {
                        info.run_state = Some(RunState::Pending);
                        debug!(task = %info.name, "marked Pending for this run");
                        joined.push(name);
                    }
                }
                None => {
                    warn!(task = %name, "node in DAG not present in tasks map");
                }
            }
        }

        self.block_behind_failures(&joined)
    }

    /// Mark `Blocked` every candidate that is still `Pending` and sits behind
    /// a failed or blocked predecessor. Repeats until nothing changes, so
    /// chains of newly joined tasks are blocked transitively.
    fn block_behind_failures(&mut self, candidates: &[TaskName]) -> Vec<TaskName> {
        let mut blocked = Vec::new();
        loop {
            let next: Vec<TaskName> = candidates
                .iter()
                .filter(|name| {
                    self.tasks.get(name.as_str()).is_some_and(|info| {
                        info.run_state == Some(RunState::Pending)
                            && info.deps.iter().any(|dep| {
                                self.tasks.get(dep).is_some_and(|d| {
                                    matches!(
                                        d.run_state,
                                        Some(RunState::DoneFailed | RunState::Blocked)
                                    )
                                })
                            })
                    })
                })
                .cloned()
                .collect();

            if next.is_empty() {
                return blocked;
            }
            for name in next {
                if let Some(info) = self.tasks.get_mut(&name) {
                    info.run_state = Some(RunState::Blocked);
                    debug!(task = %info.name, "joined the run behind a failure; Blocked");
                }
                blocked.push(name);
            }
        }
    }

    /// Determine whether all predecessors of the given task have succeeded
    /// for the *current run*.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let ro = ReadOnlyStateManager::new(self.tasks);
        ro.deps_satisfied_for_info(info)
    }

    /// Mark every pending dependent (transitively) of a failed task as
    /// `Blocked` for this run.
    ///
    /// Returns the newly blocked tasks, excluding the failed task itself.
    pub fn mark_dependents_blocked(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task);
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Blocked);
                    debug!(
                        task = %info.name,
                        upstream = %failed_task,
                        "marking dependent as Blocked due to upstream failure"
                    );
                    newly_blocked.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name));
                }
            }
        }

        newly_blocked
    }

    /// Collect tasks that are `Pending` and whose predecessors succeeded,
    /// mark them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                info!(
                    task = %info.name,
                    run_id = self.current_run_id,
                    rerun = is_rerun,
                    "scheduling task"
                );

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Check if all participating tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks
            .values()
            .all(|info| info.run_state.is_none_or(RunState::is_terminal))
    }

    /// Summarise the terminal states of the current run.
    pub fn report(&self) -> RunReport {
        let mut report = RunReport {
            run_id: self.current_run_id.unwrap_or(0),
            ..RunReport::default()
        };

        for info in self.tasks.values() {
            match info.run_state {
                Some(RunState::DoneSuccess) => report.succeeded.push(info.name.clone()),
                Some(RunState::DoneFailed) => report.failed.push((
                    info.name.clone(),
                    info.last_error.clone().unwrap_or_default(),
                )),
                Some(RunState::Blocked) => report.blocked.push(info.name.clone()),
                _ => {}
            }
        }

        report.succeeded.sort();
        report.failed.sort();
        report.blocked.sort();
        report
    }
}

/// A read-only view of the state manager for checking dependency satisfaction.
///
/// This is used when we only have shared access to the tasks map (e.g. in `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                return false;
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) => true,
                Some(_) => false,
                // Not part of this run; rely on history.
                None => dep.last_successful_run.is_some(),
            }
        })
    }
}
