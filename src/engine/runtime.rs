// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{RunReport, ScheduledTask};
use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent, TaskName};

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels and dispatching tasks to the executor.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run one group of targets to completion and return its report.
    ///
    /// Targets of a group run concurrently, subject to their predecessors.
    /// A shutdown request while the group is running yields
    /// [`PipelineError::Interrupted`].
    pub async fn run_group(&mut self, targets: &[TaskName]) -> Result<RunReport> {
        info!(?targets, "starting task group");

        let step = self.core.start_group(targets);
        let mut finished = self.execute_step(step).await?;

        loop {
            if let Some(report) = finished.take() {
                return Ok(report);
            }

            let event = self.event_rx.recv().await.ok_or_else(|| {
                PipelineError::Other(anyhow::anyhow!("runtime event channel closed mid-run"))
            })?;
            debug!(?event, "runtime received event");

            if matches!(event, RuntimeEvent::ShutdownRequested) {
                info!("shutdown requested while a group was running");
                return Err(PipelineError::Interrupted);
            }

            let step = self.core.step(event);
            finished = self.execute_step(step).await?;
        }
    }

    /// Run groups strictly left to right. Stops after the first group whose
    /// run did not fully succeed; the returned reports end with that one.
    pub async fn run_sequence(&mut self, groups: &[Vec<TaskName>]) -> Result<Vec<RunReport>> {
        let mut reports = Vec::with_capacity(groups.len());

        for group in groups {
            let report = self.run_group(group).await?;
            let ok = report.is_success();
            log_report(&report);
            reports.push(report);
            if !ok {
                break;
            }
        }

        Ok(reports)
    }

    /// Main event loop for watch mode.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Dispatches tasks and logs finished runs. A failed run does not stop
    ///   the loop; only a shutdown request or a closed channel does.
    pub async fn run(mut self) -> Result<()> {
        info!("assetdag runtime started; waiting for changes");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            let keep_running = step.keep_running;

            for command in step.commands {
                if let Some(report) = self.execute_command(command).await? {
                    log_report(&report);
                }
            }

            if !keep_running {
                info!("shutdown requested; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Execute every command of a step; returns the first finished report.
    async fn execute_step(&mut self, step: CoreStep) -> Result<Option<RunReport>> {
        let mut finished = None;
        for command in step.commands {
            if let Some(report) = self.execute_command(command).await? {
                finished.get_or_insert(report);
            }
        }
        Ok(finished)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<Option<RunReport>> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
                Ok(None)
            }
            CoreCommand::RunFinished(report) => Ok(Some(report)),
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

fn log_report(report: &RunReport) {
    if report.is_success() {
        info!(
            run_id = report.run_id,
            tasks = ?report.succeeded,
            "run finished"
        );
    } else {
        error!(
            run_id = report.run_id,
            summary = %report.failure_summary(),
            "run failed"
        );
    }
}
