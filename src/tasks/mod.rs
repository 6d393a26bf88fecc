// src/tasks/mod.rs

//! Task catalogue.
//!
//! Each built-in task is a plain function over the [`BuildContext`]; the
//! [`TaskRegistry`] pairs it with its name and the tasks it depends on, and
//! turns the whole catalogue into a [`DagGraph`].

pub mod build;
pub mod clean;
pub mod extras;
pub mod fileinclude;
pub mod fonts;
pub mod html;
pub mod images;
pub mod lint;
pub mod scripts;
pub mod styles;
pub mod wiredep;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::BuildContext;
use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::errors::{Result, TaskError};

/// The body of a task.
pub trait TaskAction: Send + Sync {
    fn run(&self, ctx: &BuildContext) -> std::result::Result<(), TaskError>;
}

impl<F> TaskAction for F
where
    F: Fn(&BuildContext) -> std::result::Result<(), TaskError> + Send + Sync,
{
    fn run(&self, ctx: &BuildContext) -> std::result::Result<(), TaskError> {
        self(ctx)
    }
}

/// A registered task: its predecessors and its action.
#[derive(Clone)]
pub struct TaskDef {
    pub deps: Vec<TaskName>,
    pub action: Arc<dyn TaskAction>,
}

impl std::fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDef").field("deps", &self.deps).finish_non_exhaustive()
    }
}

/// Name-ordered table of tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock catalogue.
    ///
    /// `html` waits for `styles` and `scripts`; `build` waits for the whole
    /// production set. The remaining tasks are independent.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register("styles", &[], styles::run)
            .register("scripts", &[], scripts::run)
            .register("fileinclude", &[], fileinclude::run)
            .register("lint", &[], lint::run)
            .register("lint:test", &[], lint::run_test)
            .register("html", &["styles", "scripts"], html::run)
            .register("images", &[], images::run)
            .register("fonts", &[], fonts::run)
            .register("extras", &[], extras::run)
            .register("clean", &[], clean::run)
            .register("wiredep", &[], wiredep::run)
            .register(
                "build",
                &["lint", "html", "images", "fonts", "extras"],
                build::run,
            );
        registry
    }

    /// Add or replace a task.
    pub fn register(
        &mut self,
        name: &str,
        deps: &[&str],
        action: impl TaskAction + 'static,
    ) -> &mut Self {
        self.tasks.insert(
            name.to_string(),
            TaskDef {
                deps: deps.iter().map(|d| d.to_string()).collect(),
                action: Arc::new(action),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn action(&self, name: &str) -> Option<Arc<dyn TaskAction>> {
        self.tasks.get(name).map(|def| Arc::clone(&def.action))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Build and validate the dependency graph of every registered task.
    pub fn graph(&self) -> Result<DagGraph> {
        DagGraph::build(
            self.tasks
                .iter()
                .map(|(name, def)| (name.as_str(), def.deps.as_slice())),
        )
    }
}
