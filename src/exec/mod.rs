// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`executor_loop`] receives scheduled tasks and spawns one runner each.
//! - [`task_runner`] runs a task action on the blocking pool and reports
//!   the outcome back to the runtime.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production, which tests can replace with
//!   a fake implementation.
//! - [`tool`] runs external tool commands (stdin to stdout) for transforms.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;
pub mod tool;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use tool::{ToolVars, render_command, run_tool, run_tool_raw};
