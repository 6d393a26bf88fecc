// src/errors.rs

//! Crate-wide error types.
//!
//! - [`PipelineError`] covers configuration, graph construction and run
//!   level failures.
//! - [`TaskError`] is what a single task action returns.
//! - [`TransformError`] is a per-file failure inside a transform pipeline.
//! - [`ToolError`] is a failure of an external tool command.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Run {run_id} failed: {summary}")]
    RunFailed { run_id: u64, summary: String },

    #[error("Interrupted")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} file(s) failed to transform")]
    Transform { failed: usize, total: usize },

    #[error("{errors} lint error(s) remaining")]
    Lint { errors: usize },

    #[error("Dependency manifest error: {0}")]
    Manifest(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Sass: {0}")]
    Sass(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Include of '{include}' failed: {reason}")]
    Include { include: String, reason: String },

    #[error("Bundle reference '{0}' not found on the search path")]
    MissingReference(String),

    #[error("Image: {0}")]
    Image(#[from] image::ImageError),

    #[error("File is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{tool}' exited with status {code}: {stderr}")]
    Failed {
        tool: String,
        code: i32,
        stderr: String,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
