// src/tasks/extras.rs

//! `extras`: copy top-level files of the source tree (dotfiles included,
//! pages excluded) to the output tree.

use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::pipeline::{Pipeline, SourceSet};

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let app = ctx.config.project.app_dir.to_string_lossy().replace('\\', "/");
    let files = SourceSet::new(&ctx.root)
        .glob(format!("{app}/*"))
        .glob(format!("!{app}/**/*.html"))
        .dot(true)
        .read()?;

    Pipeline::named("extras")
        .run(files, &ctx.resolve(&ctx.config.project.dist_dir), ctx)?
        .into_result()
        .map(drop)
}
