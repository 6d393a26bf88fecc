// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};

/// Task dependency graph.
///
/// Edges point from a predecessor to the task that waits on it. The graph is
/// validated at construction: every predecessor must be a known task, no task
/// may depend on itself, and there must be no cycles.
#[derive(Debug, Clone)]
pub struct DagGraph {
    graph: DiGraph<TaskName, ()>,
    index: HashMap<TaskName, NodeIndex>,
}

impl DagGraph {
    /// Build the graph from `(task, predecessors)` pairs.
    pub fn build<'a, I>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [TaskName])>,
    {
        let tasks: Vec<(&str, &[TaskName])> = tasks.into_iter().collect();

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for (name, _) in &tasks {
            if index.contains_key(*name) {
                return Err(PipelineError::ConfigError(format!(
                    "task '{name}' is defined twice"
                )));
            }
            let node = graph.add_node(name.to_string());
            index.insert(name.to_string(), node);
        }

        for (name, deps) in &tasks {
            let to = index[*name];
            for dep in deps.iter() {
                if dep == name {
                    return Err(PipelineError::ConfigError(format!(
                        "task '{name}' depends on itself"
                    )));
                }
                let from = *index.get(dep).ok_or_else(|| {
                    PipelineError::TaskNotFound(format!("'{dep}' (predecessor of '{name}')"))
                })?;
                graph.update_edge(from, to, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(PipelineError::DagCycle(graph[cycle.node_id()].clone()));
        }

        Ok(Self { graph, index })
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Immediate predecessors of a task.
    pub fn dependencies_of(&self, name: &str) -> Vec<TaskName> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Immediate dependents of a task (tasks that list this one as a predecessor).
    pub fn dependents_of(&self, name: &str) -> Vec<TaskName> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// The task itself plus every transitive predecessor.
    pub fn with_predecessors(&self, name: &str) -> Vec<TaskName> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut stack = vec![start];
        let mut out = Vec::new();

        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            out.push(self.graph[node].clone());
            stack.extend(self.graph.neighbors_directed(node, Direction::Incoming));
        }

        out
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<TaskName> {
        match self.index.get(name) {
            Some(&node) => {
                let mut names: Vec<TaskName> = self
                    .graph
                    .neighbors_directed(node, dir)
                    .map(|n| self.graph[n].clone())
                    .collect();
                names.sort();
                names
            }
            None => Vec::new(),
        }
    }
}
