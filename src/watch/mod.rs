// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling the watch rules of an entry (`patterns.rs`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning events into task triggers or reload broadcasts
//!   (`event_handler.rs`).
//!
//! It does **not** know about task dependencies; the scheduler pulls in a
//! triggered task's predecessors.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{WatchAction, WatchRule, serve_rules, test_rules};
pub use watcher::{WatcherHandle, spawn_watcher};
