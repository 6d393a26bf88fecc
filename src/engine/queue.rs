// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, info};

use super::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived for tasks already participating in the active run.
///
/// - Each queued entry is a *batch* of task names for one future run.
/// - `max_runs` (`queue_length` in the config) bounds the number of batches.
/// - When the scheduler becomes idle the runtime calls [`next_run`], which
///   hands out the oldest batch.
///
/// [`next_run`]: TriggerQueue::next_run
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record that a task was triggered while it is part of the active run.
    ///
    /// - `Queue`: add the task to the newest batch. A task already waiting
    ///   there opens a further batch while fewer than `max_runs` exist;
    ///   otherwise the trigger is already covered.
    /// - `Cancel`: forget all queued batches and keep only this task.
    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let len = self.runs.len();
                match self.runs.back_mut() {
                Some(last) if !last.contains(&name) => {
                    last.insert(name.clone());
                    debug!(task = %name, batch = len, "merged trigger into newest queued batch");
                }
                Some(_) if len < self.max_runs => {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(task = %name, batch = self.runs.len(), "queued another run");
                }
                Some(_) => {
                    debug!(
                        task = %name,
                        max_runs = self.max_runs,
                        "task already queued and queue_length reached; trigger coalesced"
                    );
                }
                None => {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(task = %name, "created first queued batch");
                }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                let dropped: BTreeSet<TaskName> = self
                    .runs
                    .drain(..)
                    .flatten()
                    .filter(|t| *t != name)
                    .collect();
                if !dropped.is_empty() {
                    info!(
                        task = %name,
                        ?dropped,
                        "cancel mode: dropping queued triggers in favour of the latest"
                    );
                }
                self.runs.push_back(BTreeSet::from([name]));
            }
        }
    }

    /// Take the oldest queued batch as the triggers of the next run.
    pub fn next_run(&mut self) -> Vec<TaskName> {
        let batch = self.runs.pop_front().unwrap_or_default();
        if !batch.is_empty() {
            debug!(tasks = batch.len(), remaining = self.runs.len(), "starting queued run");
        }
        batch.into_iter().collect()
    }
}
