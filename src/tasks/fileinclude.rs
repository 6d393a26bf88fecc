// src/tasks/fileinclude.rs

//! `fileinclude`: expand `@@include` directives of the HTML pages into the
//! intermediate tree.

use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::paths::AssetClass;
use crate::pipeline::include::FileInclude;
use crate::pipeline::{Pipeline, SourceSet};

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let html = ctx.class(AssetClass::Html);
    let files = SourceSet::new(&ctx.root).glob(&html.input).read()?;

    let output = Pipeline::named("fileinclude")
        .stage(FileInclude)
        .run(files, &ctx.tmp_dir(AssetClass::Html), ctx)?;

    if !output.written.is_empty() {
        ctx.reload.reload();
    }
    output.into_result().map(drop)
}
