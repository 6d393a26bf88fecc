// src/tasks/fonts.rs

//! `fonts`: collect component fonts and local fonts.
//!
//! Files land flat (relative to their own glob base) in the intermediate
//! tree during development and in the output tree for production builds.

use globset::{Glob, GlobMatcher};

use crate::bower;
use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::paths::AssetClass;
use crate::pipeline::{Pipeline, SourceSet};

const FONT_FILES: &str = "**/*.{eot,svg,ttf,woff,woff2}";

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let fonts = ctx.class(AssetClass::Fonts);
    let matcher = font_matcher()?;

    let component_fonts = bower::main_files(ctx)?
        .into_iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .filter(|p| matcher.is_match(p))
        .map(|p| globset::escape(&p));

    let files = SourceSet::new(&ctx.root)
        .globs(component_fonts)
        .glob(&fonts.input)
        .read()?;

    let dest = if ctx.mode.is_production() {
        ctx.output_dir(AssetClass::Fonts)
    } else {
        ctx.tmp_dir(AssetClass::Fonts)
    };

    Pipeline::named("fonts")
        .run(files, &dest, ctx)?
        .into_result()
        .map(drop)
}

fn font_matcher() -> Result<GlobMatcher, TaskError> {
    Glob::new(FONT_FILES)
        .map(|g| g.compile_matcher())
        .map_err(|e| TaskError::Other(e.into()))
}
