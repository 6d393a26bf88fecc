// src/pipeline/minify.rs

//! HTML whitespace collapsing.

use crate::context::BuildContext;
use crate::errors::TransformError;
use crate::pipeline::{SourceFile, Transform};

/// Elements whose text is kept verbatim.
const RAW_ELEMENTS: [&str; 4] = ["pre", "textarea", "script", "style"];

/// Pipeline stage wrapping [`collapse_whitespace`].
pub struct CollapseWhitespace;

impl Transform for CollapseWhitespace {
    fn name(&self) -> &str {
        "htmlmin"
    }

    fn apply(&self, mut file: SourceFile, _ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        file.contents = collapse_whitespace(&file.text()?).into_bytes();
        Ok(file)
    }
}

/// Collapse runs of whitespace to a single space, except inside raw
/// elements. Leading and trailing whitespace of the document is dropped.
pub fn collapse_whitespace(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some((start, tag)) = next_raw_element(&lower, pos) {
        collapse_into(&mut out, &html[pos..start]);

        let close = format!("</{tag}");
        let end = lower[start..]
            .find(&close)
            .and_then(|c| lower[start + c..].find('>').map(|g| start + c + g + 1))
            .unwrap_or(html.len());

        out.push_str(&html[start..end]);
        pos = end;
    }
    collapse_into(&mut out, &html[pos..]);

    out.trim().to_string()
}

fn next_raw_element(lower: &str, from: usize) -> Option<(usize, &'static str)> {
    RAW_ELEMENTS
        .iter()
        .filter_map(|tag| {
            let open = format!("<{tag}");
            let mut search = from;
            while let Some(i) = lower[search..].find(&open) {
                let at = search + i;
                let after = lower[at + open.len()..].chars().next();
                if matches!(after, Some(c) if c == '>' || c == '/' || c.is_ascii_whitespace()) {
                    return Some((at, *tag));
                }
                search = at + open.len();
            }
            None
        })
        .min_by_key(|(at, _)| *at)
}

fn collapse_into(out: &mut String, text: &str) {
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
}
