// src/pipeline/include.rs

//! `@@include('partial.html', {"key": "value"})` expansion.
//!
//! Paths are relative to the including file. Included files are expanded
//! recursively, and `@@key` tokens inside them are replaced by the values of
//! the include's JSON context (merged over the parent's context).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::context::BuildContext;
use crate::errors::TransformError;
use crate::pipeline::{SourceFile, Transform};

const DIRECTIVE: &str = "@@include(";
const MAX_DEPTH: usize = 32;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@([A-Za-z_][A-Za-z0-9_.]*)").expect("variable pattern is valid")
});

type Context = Map<String, Value>;

/// Pipeline stage resolving include directives.
pub struct FileInclude;

impl Transform for FileInclude {
    fn name(&self) -> &str {
        "fileinclude"
    }

    fn apply(&self, mut file: SourceFile, _ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        let text = file.text()?;
        let dir = file.path.parent().unwrap_or(Path::new("")).to_path_buf();
        let mut stack = vec![identity(&file.path)];
        let expanded = expand(&text, &dir, &Context::new(), &mut stack)?;
        file.contents = expanded.into_bytes();
        Ok(file)
    }
}

/// Expand every directive in `text`, resolving paths against `dir`.
pub fn expand(
    text: &str,
    dir: &Path,
    context: &Context,
    stack: &mut Vec<PathBuf>,
) -> Result<String, TransformError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(DIRECTIVE) {
        out.push_str(&rest[..pos]);
        let args = &rest[pos + DIRECTIVE.len()..];
        let (directive, consumed) = parse_directive(args)?;
        out.push_str(&include_file(&directive, dir, context, stack)?);
        rest = &args[consumed..];
    }
    out.push_str(rest);

    Ok(substitute(&out, context))
}

#[derive(Debug, PartialEq)]
struct Directive {
    path: String,
    context: Context,
}

fn include_file(
    directive: &Directive,
    dir: &Path,
    parent: &Context,
    stack: &mut Vec<PathBuf>,
) -> Result<String, TransformError> {
    let fail = |reason: String| TransformError::Include {
        include: directive.path.clone(),
        reason,
    };

    if stack.len() > MAX_DEPTH {
        return Err(fail(format!("nesting deeper than {MAX_DEPTH} levels")));
    }

    let path = dir.join(&directive.path);
    let id = identity(&path);
    if stack.contains(&id) {
        return Err(fail("include cycle".to_string()));
    }

    let text = std::fs::read_to_string(&path).map_err(|e| fail(e.to_string()))?;

    let mut context = parent.clone();
    context.extend(directive.context.clone());

    stack.push(id);
    let child_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
    let result = expand(&text, &child_dir, &context, stack);
    stack.pop();
    result
}

fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Parse `'path' [, {json}] )` and return the directive plus the number of
/// bytes consumed (including the closing parenthesis).
fn parse_directive(args: &str) -> Result<(Directive, usize), TransformError> {
    let snippet: String = args.chars().take(40).collect();
    let fail = |reason: &str| TransformError::Include {
        include: snippet.clone(),
        reason: reason.to_string(),
    };

    let mut pos = skip_ws(args, 0);
    let quote = args[pos..]
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| fail("expected a quoted path"))?;
    pos += 1;
    let end = args[pos..]
        .find(quote)
        .ok_or_else(|| fail("unterminated path"))?;
    let path = args[pos..pos + end].to_string();
    pos = skip_ws(args, pos + end + 1);

    let mut context = Context::new();
    if args[pos..].starts_with(',') {
        pos = skip_ws(args, pos + 1);
        let len = json_object_len(&args[pos..]).ok_or_else(|| fail("malformed context object"))?;
        context = serde_json::from_str(&args[pos..pos + len])
            .map_err(|e| fail(&format!("invalid context: {e}")))?;
        pos = skip_ws(args, pos + len);
    }

    if !args[pos..].starts_with(')') {
        return Err(fail("expected ')'"));
    }

    Ok((Directive { path, context }, pos + 1))
}

fn skip_ws(s: &str, from: usize) -> usize {
    from + s[from..].len() - s[from..].trim_start().len()
}

/// Length of the balanced `{...}` at the start of `s`, honouring strings.
fn json_object_len(s: &str) -> Option<usize> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn substitute(text: &str, context: &Context) -> String {
    if context.is_empty() {
        return text.to_string();
    }
    VARIABLE
        .replace_all(text, |caps: &Captures<'_>| match lookup(context, &caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn lookup<'a>(context: &'a Context, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut value = context.get(parts.next()?)?;
    for part in parts {
        value = value.get(part)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    fn run(dir: &Path, text: &str) -> Result<String, TransformError> {
        let mut stack = Vec::new();
        expand(text, dir, &Context::new(), &mut stack)
    }

    #[test]
    fn nested_includes_with_context() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "partials/head.html", "<title>@@title</title>@@include('meta.html')");
        write(dir.path(), "partials/meta.html", "<meta name=\"v\" content=\"@@page.version\">");

        let out = run(
            dir.path(),
            r#"<head>@@include('partials/head.html', {"title": "Home", "page": {"version": 2}})</head>"#,
        )
        .unwrap();

        assert_eq!(
            out,
            "<head><title>Home</title><meta name=\"v\" content=\"2\"></head>"
        );
    }

    #[test]
    fn unknown_variables_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.html", "@@known @@unknown");
        let out = run(dir.path(), r#"@@include("a.html", {"known": "yes"})"#).unwrap();
        assert_eq!(out, "yes @@unknown");
    }

    #[test]
    fn cycles_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.html", "@@include('b.html')");
        write(dir.path(), "b.html", "@@include('a.html')");

        let err = run(dir.path(), "@@include('a.html')").unwrap_err();
        assert!(matches!(err, TransformError::Include { .. }), "{err}");
    }

    #[test]
    fn missing_file_names_the_include() {
        let dir = tempfile::tempdir().unwrap();
        match run(dir.path(), "x @@include('nope.html') y").unwrap_err() {
            TransformError::Include { include, .. } => assert_eq!(include, "nope.html"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parses_directive_arguments() {
        let (directive, consumed) =
            parse_directive(r#" 'x.html' , {"a": "}"} ) rest"#).unwrap();
        assert_eq!(directive.path, "x.html");
        assert_eq!(directive.context.get("a"), Some(&Value::String("}".into())));
        assert_eq!(&r#" 'x.html' , {"a": "}"} ) rest"#[consumed..], " rest");
    }
}
