// src/pipeline/useref.rs

//! Bundle blocks in HTML:
//!
//! ```html
//! <!-- build:css styles/vendor.css -->
//! <link rel="stylesheet" href="/bower_components/normalize.css/normalize.css">
//! <!-- endbuild -->
//! ```
//!
//! Every referenced file is looked up on the search path and concatenated
//! into the block's target; the block is replaced by a single reference.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::TransformError;
use crate::pipeline::SourceFile;

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*build:(\w+)(?:\([^)]*\))?\s+(\S+?)\s*-->(.*?)<!--\s*endbuild\s*-->")
        .expect("build block pattern is valid")
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:href|src)\s*=\s*["']([^"']+)["']"#).expect("reference pattern is valid")
});

/// A concatenated bundle produced from one build block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub kind: String,
    /// Target as written in the block, without a leading `/`.
    pub target: String,
    pub contents: Vec<u8>,
}

impl Bundle {
    /// The bundle as a pipeline file, placed next to the page it came from.
    pub fn into_source(self, page_rel_dir: &Path, root: &Path) -> SourceFile {
        let rel = page_rel_dir.join(&self.target);
        SourceFile::new(root.join(&rel), rel, self.contents)
    }
}

/// Replace each build block in `html` and return the rewritten page with the
/// bundles it references.
///
/// `page_rel_dir` is the page's directory relative to its glob base; refs are
/// tried relative to it first, then to each search directory's top.
pub fn resolve_blocks(
    html: &str,
    page_rel_dir: &Path,
    search_path: &[PathBuf],
) -> Result<(String, Vec<Bundle>), TransformError> {
    let mut out = String::with_capacity(html.len());
    let mut bundles = Vec::new();
    let mut last = 0;

    for caps in BLOCK.captures_iter(html) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let kind = &caps[1];
        let target = &caps[2];
        let body = &caps[3];

        out.push_str(&html[last..whole.start]);
        last = whole.end;

        let replacement = match kind {
            "css" => format!(r#"<link rel="stylesheet" href="{target}">"#),
            "js" => format!(r#"<script src="{target}"></script>"#),
            // Unknown block types keep their content.
            _ => {
                out.push_str(body.trim());
                continue;
            }
        };

        let mut contents = Vec::new();
        for reference in REFERENCE.captures_iter(body) {
            let found = locate(&reference[1], page_rel_dir, search_path)?;
            let bytes = std::fs::read(&found)?;
            if !contents.is_empty() {
                contents.push(b'\n');
            }
            contents.extend_from_slice(&bytes);
        }

        bundles.push(Bundle {
            kind: kind.to_string(),
            target: target.trim_start_matches('/').to_string(),
            contents,
        });
        out.push_str(&replacement);
    }

    out.push_str(&html[last..]);
    Ok((out, bundles))
}

fn locate(reference: &str, page_rel_dir: &Path, search_path: &[PathBuf]) -> Result<PathBuf, TransformError> {
    let clean = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    let absolute = clean.starts_with('/');
    let clean = clean.trim_start_matches('/');

    for dir in search_path {
        let mut candidates = Vec::with_capacity(2);
        if !absolute {
            candidates.push(normalize(&dir.join(page_rel_dir).join(clean)));
        }
        candidates.push(normalize(&dir.join(clean)));

        if let Some(found) = candidates.into_iter().find(|c| c.is_file()) {
            return Ok(found);
        }
    }

    Err(TransformError::MissingReference(reference.to_string()))
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
