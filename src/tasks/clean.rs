// src/tasks/clean.rs

//! `clean`: remove the intermediate and output trees.

use std::io::ErrorKind;

use tracing::debug;

use crate::context::BuildContext;
use crate::errors::TaskError;

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    for dir in [&ctx.config.project.tmp_dir, &ctx.config.project.dist_dir] {
        let path = ctx.resolve(dir);
        match std::fs::remove_dir_all(&path) {
            Ok(()) => debug!(path = %path.display(), "removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(TaskError::io(path, e)),
        }
    }
    Ok(())
}
