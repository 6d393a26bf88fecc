// src/tasks/scripts.rs

//! `scripts`: transpile script sources into the intermediate tree.

use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::paths::AssetClass;
use crate::pipeline::{Pipeline, SourceSet, ToolTransform};

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let scripts = ctx.class(AssetClass::Scripts);
    let files = SourceSet::new(&ctx.root).glob(&scripts.input).read()?;

    let output = Pipeline::named("scripts")
        .stage(ToolTransform::new("transpiler", &ctx.config.scripts.transpiler))
        .run(files, &ctx.tmp_dir(AssetClass::Scripts), ctx)?;

    if !output.written.is_empty() {
        ctx.reload.reload();
    }
    output.into_result().map(drop)
}
