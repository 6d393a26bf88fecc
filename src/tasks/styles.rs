// src/tasks/styles.rs

//! `styles`: Sass sources to prefixed CSS in the intermediate tree.

use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::context::BuildContext;
use crate::errors::{TaskError, TransformError};
use crate::paths::AssetClass;
use crate::pipeline::{Pipeline, SourceFile, SourceSet, ToolTransform, Transform};

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let styles = ctx.class(AssetClass::Styles);
    let files = SourceSet::new(&ctx.root)
        .glob(&styles.input)
        .glob("!**/_*")
        .read()?;

    let mut pipeline = Pipeline::named("styles").stage(SassCompile::new(ctx));
    if let Some(prefixer) = &ctx.config.styles.prefixer {
        pipeline = pipeline.stage(
            ToolTransform::new("prefixer", prefixer)
                .env("BROWSERSLIST", ctx.config.styles.browsers.join(", ")),
        );
    }

    let output = pipeline.run(files, &ctx.tmp_dir(AssetClass::Styles), ctx)?;
    ctx.reload
        .reload_css(output.written.iter().map(|p| ctx.served_url(p)).collect());
    output.into_result().map(drop)
}

/// Compiles one Sass entry point. Partials are resolved against the
/// configured load paths and the entry point's own directory.
pub struct SassCompile {
    load_paths: Vec<PathBuf>,
}

impl SassCompile {
    pub fn new(ctx: &BuildContext) -> Self {
        Self {
            load_paths: ctx
                .config
                .styles
                .include_paths
                .iter()
                .map(|p| ctx.resolve(p))
                .collect(),
        }
    }
}

impl Transform for SassCompile {
    fn name(&self) -> &str {
        "sass"
    }

    fn apply(&self, mut file: SourceFile, _ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        let source = file.text()?;

        let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
        for path in &self.load_paths {
            options = options.load_path(path);
        }
        if let Some(dir) = file.path.parent() {
            options = options.load_path(dir);
        }

        let css = grass::from_string(source.clone(), &options)
            .map_err(|e| TransformError::Sass(e.to_string()))?;

        let source_name = slash_path(&file.rel);
        file.rel.set_extension("css");
        let map = SourceMap {
            version: 3,
            file: slash_path(&file.rel),
            sources: vec![source_name],
            sources_content: vec![source],
            names: Vec::new(),
            mappings: String::new(),
        };
        file.contents = with_inline_map(css, &map)?.into_bytes();
        Ok(file)
    }
}

/// Version 3 source map carrying the original Sass text.
///
/// grass produces no position data, so `mappings` stays empty and the map
/// only links the stylesheet back to its source.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap {
    version: u8,
    file: String,
    sources: Vec<String>,
    sources_content: Vec<String>,
    names: Vec<String>,
    mappings: String,
}

fn with_inline_map(mut css: String, map: &SourceMap) -> Result<String, TransformError> {
    let json = serde_json::to_vec(map).map_err(|e| TransformError::Sass(e.to_string()))?;
    if !css.ends_with('\n') {
        css.push('\n');
    }
    css.push_str("/*# sourceMappingURL=data:application/json;charset=utf-8;base64,");
    css.push_str(&STANDARD.encode(json));
    css.push_str(" */\n");
    Ok(css)
}

fn slash_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
