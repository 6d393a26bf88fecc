// src/tasks/html.rs

//! `html`: production packaging of the pages.
//!
//! Resolves bundle blocks, minifies the resulting scripts and stylesheets,
//! expands includes and collapses whitespace in the pages, and writes
//! everything to the output tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::error;

use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::paths::AssetClass;
use crate::pipeline::include::FileInclude;
use crate::pipeline::minify::CollapseWhitespace;
use crate::pipeline::useref::resolve_blocks;
use crate::pipeline::{Conditional, Pipeline, SourceFile, SourceSet, ToolTransform};

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let html = ctx.class(AssetClass::Html);
    let pages = SourceSet::new(&ctx.root).glob(&html.input).read()?;
    let search_path: Vec<PathBuf> = ctx
        .config
        .html
        .search_path
        .iter()
        .map(|p| ctx.resolve(p))
        .collect();

    let mut files = Vec::new();
    let mut bundles: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();
    let mut failed = 0;

    for mut page in pages {
        let rel_dir = page.rel.parent().unwrap_or(Path::new("")).to_path_buf();
        let resolved = page
            .text()
            .and_then(|text| resolve_blocks(&text, &rel_dir, &search_path));
        match resolved {
            Ok((text, page_bundles)) => {
                page.contents = text.into_bytes();
                for bundle in page_bundles {
                    let file = bundle.into_source(&rel_dir, &ctx.root);
                    bundles.entry(file.rel.clone()).or_insert(file);
                }
                files.push(page);
            }
            Err(err) => {
                error!(task = "html", path = %page.path.display(), error = %err, "bundling failed");
                failed += 1;
            }
        }
    }
    files.extend(bundles.into_values());

    let output = packaging_pipeline(ctx)?.run(files, &ctx.output_dir(AssetClass::Html), ctx)?;
    if failed + output.failed > 0 {
        return Err(TaskError::Transform {
            failed: failed + output.failed,
            total: failed + output.total,
        });
    }
    Ok(())
}

fn packaging_pipeline(ctx: &BuildContext) -> Result<Pipeline, TaskError> {
    let cfg = &ctx.config.html;
    let mut pipeline = Pipeline::named("html");

    if let Some(cmd) = &cfg.js_minifier {
        pipeline = pipeline.stage(conditional("*.js", ToolTransform::new("js-minifier", cmd))?);
    }
    if let Some(cmd) = &cfg.css_minifier {
        pipeline = pipeline.stage(conditional("*.css", ToolTransform::new("css-minifier", cmd))?);
    }
    pipeline = pipeline.stage(conditional("*.html", FileInclude)?);
    if cfg.collapse_whitespace {
        pipeline = pipeline.stage(conditional("*.html", CollapseWhitespace)?);
    }
    Ok(pipeline)
}

fn conditional(
    pattern: &str,
    stage: impl crate::pipeline::Transform + 'static,
) -> Result<Conditional, TaskError> {
    Conditional::new(pattern, stage).map_err(|e| TaskError::Other(e.into()))
}
