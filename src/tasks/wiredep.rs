// src/tasks/wiredep.rs

//! `wiredep`: inject component files into the sources.
//!
//! Style entry points get `@import` lines between `// bower:scss` and
//! `// endbower`; pages get `<link>`/`<script>` tags between
//! `<!-- bower:css -->` (or `js`) and `<!-- endbower -->`. Sources are
//! rewritten in place and only when the injected block changes.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use tracing::info;

use crate::bower::{self, Component};
use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::paths::{AssetClass, glob_base, relative_to};
use crate::pipeline::SourceSet;

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)//\s*bower:(\w+)[^\n]*\n(?s:.*?)^[ \t]*//\s*endbower")
        .expect("style block pattern is valid")
});

static HTML_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)<!--\s*bower:(\w+)\s*-->(?s:.*?)<!--\s*endbower\s*-->")
        .expect("html block pattern is valid")
});

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let components = bower::load_components(ctx)?;

    let styles_ignore = Regex::new(&ctx.config.wiredep.styles_ignore_path)
        .context("invalid wiredep.styles_ignore_path")?;
    let html_ignore = Regex::new(&ctx.config.wiredep.html_ignore_path)
        .context("invalid wiredep.html_ignore_path")?;

    let styles_base = glob_base(&ctx.class(AssetClass::Styles).input);
    let style_sources = SourceSet::new(&ctx.root)
        .glob(format!("{}/*.scss", styles_base.to_string_lossy().replace('\\', "/")))
        .files()?;
    let style_files = component_files(&components, &[]);
    for source in style_sources {
        inject_file(ctx, &source.path, &STYLE_BLOCK, &|kind, dir| {
            injected(&style_files, kind, dir, &styles_ignore)
                .into_iter()
                .map(|p| format!("@import \"{p}\";"))
                .collect()
        })?;
    }

    let page_sources = SourceSet::new(&ctx.root)
        .glob(&ctx.class(AssetClass::Html).input)
        .files()?;
    let page_files = component_files(&components, &ctx.config.wiredep.exclude);
    for source in page_sources {
        inject_file(ctx, &source.path, &HTML_BLOCK, &|kind, dir| {
            injected(&page_files, kind, dir, &html_ignore)
                .into_iter()
                .map(|p| match kind {
                    "css" => format!(r#"<link rel="stylesheet" href="{p}" />"#),
                    _ => format!(r#"<script src="{p}"></script>"#),
                })
                .collect()
        })?;
    }

    Ok(())
}

fn component_files(components: &[Component], exclude: &[String]) -> Vec<PathBuf> {
    components
        .iter()
        .flat_map(|c| c.files.iter())
        .filter(|f| {
            let s = f.to_string_lossy();
            !exclude.iter().any(|x| s.contains(x.as_str()))
        })
        .cloned()
        .collect()
}

/// Paths of `files` with extension `kind`, relative to `dir`, with the
/// ignore pattern stripped.
fn injected(files: &[PathBuf], kind: &str, dir: &Path, ignore: &Regex) -> Vec<String> {
    files
        .iter()
        .filter(|f| f.extension().is_some_and(|e| e == kind))
        .map(|f| {
            let rel = relative_to(dir, f).to_string_lossy().replace('\\', "/");
            ignore.replace(&rel, "").into_owned()
        })
        .collect()
}

type Lines<'a> = dyn Fn(&str, &Path) -> Vec<String> + 'a;

fn inject_file(
    ctx: &BuildContext,
    path: &Path,
    block: &Regex,
    lines: &Lines<'_>,
) -> Result<(), TaskError> {
    let text = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
    let rel = path.strip_prefix(&ctx.root).unwrap_or(path);
    let dir = rel.parent().unwrap_or(Path::new(""));

    let updated = inject(&text, block, |kind| lines(kind, dir));
    if updated != text {
        ctx.write_file(path, updated.as_bytes())?;
        info!(file = %rel.display(), "injected component files");
    }
    Ok(())
}

/// Rewrite every block in `text`, keeping its marker lines and indentation.
pub fn inject(text: &str, block: &Regex, lines: impl Fn(&str) -> Vec<String>) -> String {
    block
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let whole = &caps[0];
            let indent = &caps[1];
            let open_end = whole.find('\n').map_or(whole.len(), |i| i + 1);
            let close_start = whole.rfind('\n').map_or(0, |i| i + 1);
            if open_end > close_start {
                // Single-line block: markers share a line.
                return whole.to_string();
            }

            let mut out = whole[..open_end].to_string();
            for line in lines(&caps[2]) {
                out.push_str(indent);
                out.push_str(&line);
                out.push('\n');
            }
            out.push_str(&whole[close_start..]);
            out
        })
        .into_owned()
}
