// src/entry.rs

//! Orchestration entries: what a command-line TASK name runs.

use std::fmt;

use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::tasks::TaskRegistry;
use crate::types::BuildMode;

/// A command-line target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A single registered task (with its predecessors).
    Task(TaskName),
    /// Clean, inject components, then the production build.
    Default,
    /// Development build, dev server and watchers.
    Serve,
    /// Production build, then serve the output tree.
    ServeDist,
    /// Compile scripts, then serve the test harness with watchers.
    ServeTest,
}

impl Entry {
    pub const NAMES: [&'static str; 4] = ["default", "serve", "serve:dist", "serve:test"];

    /// Resolve `name` against the entries and the registered tasks.
    pub fn parse(name: &str, registry: &TaskRegistry) -> Result<Self> {
        match name {
            "default" => Ok(Entry::Default),
            "serve" => Ok(Entry::Serve),
            "serve:dist" => Ok(Entry::ServeDist),
            "serve:test" => Ok(Entry::ServeTest),
            task if registry.contains(task) => Ok(Entry::Task(task.to_string())),
            other => Err(PipelineError::TaskNotFound(other.to_string())),
        }
    }

    /// Sequence groups run before the entry's server (if any) starts.
    pub fn groups(&self) -> Vec<Vec<TaskName>> {
        fn group(names: &[&str]) -> Vec<TaskName> {
            names.iter().map(|n| n.to_string()).collect()
        }

        match self {
            Entry::Task(name) => vec![vec![name.clone()]],
            Entry::Default | Entry::ServeDist => {
                vec![group(&["clean", "wiredep"]), group(&["build"])]
            }
            Entry::Serve => vec![
                group(&["clean", "wiredep"]),
                group(&["fileinclude", "styles", "scripts", "fonts"]),
            ],
            Entry::ServeTest => vec![group(&["scripts"])],
        }
    }

    /// Build mode implied by the entry.
    pub fn mode(&self) -> BuildMode {
        match self {
            Entry::Default | Entry::ServeDist => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    /// Whether tasks run with a live-reload server attached.
    pub fn is_live(&self) -> bool {
        matches!(self, Entry::Serve | Entry::ServeTest)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Task(name) => f.write_str(name),
            Entry::Default => f.write_str("default"),
            Entry::Serve => f.write_str("serve"),
            Entry::ServeDist => f.write_str("serve:dist"),
            Entry::ServeTest => f.write_str("serve:test"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_and_tasks_resolve() {
        let registry = TaskRegistry::builtin();
        assert_eq!(Entry::parse("serve", &registry).unwrap(), Entry::Serve);
        assert_eq!(
            Entry::parse("lint:test", &registry).unwrap(),
            Entry::Task("lint:test".into())
        );
        assert!(matches!(
            Entry::parse("deploy", &registry),
            Err(PipelineError::TaskNotFound(name)) if name == "deploy"
        ));
    }

    #[test]
    fn default_runs_clean_first_then_build() {
        assert_eq!(
            Entry::Default.groups(),
            vec![vec!["clean".to_string(), "wiredep".to_string()], vec!["build".to_string()]]
        );
        assert_eq!(Entry::Default.mode(), BuildMode::Production);
        assert!(!Entry::ServeDist.is_live());
        assert!(Entry::Serve.is_live());
        assert_eq!(Entry::Serve.mode(), BuildMode::Development);
    }
}
