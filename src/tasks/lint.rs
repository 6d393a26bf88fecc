// src/tasks/lint.rs

//! `lint` and `lint:test`.
//!
//! The linter command reads a script on stdin and prints ESLint-style JSON
//! on stdout: one result per file with its remaining `messages`, an
//! `errorCount` and, when fixes apply, the fixed `output`.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::context::BuildContext;
use crate::errors::{TaskError, ToolError, TransformError};
use crate::exec::{ToolVars, render_command, run_tool_raw};
use crate::paths::AssetClass;
use crate::pipeline::{SourceFile, SourceSet};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    #[serde(default)]
    pub messages: Vec<LintMessage>,
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
    /// Source with fixes applied; absent when nothing was fixed.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    pub rule_id: Option<String>,
    /// 1 = warning, 2 = error.
    pub severity: u8,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Lint the script sources.
///
/// Remaining errors fail the task unless a dev server is attached, in which
/// case they are only reported.
pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let scripts = ctx.class(AssetClass::Scripts);
    let files = SourceSet::new(&ctx.root).glob(&scripts.input).read()?;

    let mut errors = 0;
    let mut failed = 0;
    let total = files.len();

    for file in &files {
        match lint_file(ctx, file) {
            Ok(result) => {
                report(ctx, &file.path, &result);
                errors += result.error_count;
            }
            Err(err) => {
                error!(task = "lint", path = %file.path.display(), error = %err, "linter failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(TaskError::Transform { failed, total });
    }
    if errors > 0 {
        if ctx.live {
            warn!(errors, "lint errors remain");
        } else {
            return Err(TaskError::Lint { errors });
        }
    }
    Ok(())
}

/// Lint the script sources with fixes applied and write the fixed copies
/// into the test spec directory. Violations are reported, never fatal.
pub fn run_test(ctx: &BuildContext) -> Result<(), TaskError> {
    let scripts = ctx.class(AssetClass::Scripts);
    let files = SourceSet::new(&ctx.root).glob(&scripts.input).read()?;
    let dest = ctx.resolve(&ctx.config.lint.test_spec_dir);

    let mut failed = 0;
    let total = files.len();

    for file in &files {
        let result = match lint_file(ctx, file) {
            Ok(result) => result,
            Err(err) => {
                error!(task = "lint:test", path = %file.path.display(), error = %err, "linter failed");
                failed += 1;
                continue;
            }
        };
        report(ctx, &file.path, &result);

        let contents = result
            .output
            .map(String::into_bytes)
            .unwrap_or_else(|| file.contents.clone());
        let target = dest.join(&file.rel);
        // Unchanged copies are not rewritten so the spec watcher settles.
        if std::fs::read(&target).ok().as_deref() != Some(contents.as_slice()) {
            ctx.write_file(&target, &contents)?;
        }
    }

    if failed > 0 {
        return Err(TaskError::Transform { failed, total });
    }
    Ok(())
}

/// Run the linter over one file.
pub fn lint_file(ctx: &BuildContext, file: &SourceFile) -> Result<LintResult, TransformError> {
    let rel = file.path.strip_prefix(&ctx.root).unwrap_or(&file.path);
    let vars = ToolVars {
        file: Some(rel),
        browsers: &ctx.config.styles.browsers,
        ruleset: &ctx.config.lint.ruleset,
    };
    let command = render_command(&ctx.config.lint.command, &vars);
    let (stdout, stderr, code) = run_tool_raw(&command, &file.contents, &ctx.root, &[])?;

    match parse_results(&stdout) {
        Some(result) => Ok(result),
        None if code == 0 => Ok(LintResult::default()),
        None => Err(ToolError::Failed {
            tool: "linter".to_string(),
            code,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        }
        .into()),
    }
}

/// Merge the per-file results of one linter invocation.
fn parse_results(stdout: &[u8]) -> Option<LintResult> {
    let results: Vec<LintResult> = serde_json::from_slice(stdout).ok()?;
    Some(results.into_iter().fold(LintResult::default(), |mut acc, r| {
        acc.messages.extend(r.messages);
        acc.error_count += r.error_count;
        acc.warning_count += r.warning_count;
        acc.output = r.output.or(acc.output);
        acc
    }))
}

fn report(ctx: &BuildContext, path: &Path, result: &LintResult) {
    let rel = path.strip_prefix(&ctx.root).unwrap_or(path);
    for msg in &result.messages {
        let line = format!(
            "{}:{}:{} {} {}",
            rel.display(),
            msg.line.unwrap_or(0),
            msg.column.unwrap_or(0),
            msg.rule_id.as_deref().unwrap_or("-"),
            msg.message
        );
        if msg.severity >= 2 {
            error!("{line}");
        } else {
            warn!("{line}");
        }
    }
    if result.error_count == 0 && result.warning_count == 0 {
        info!(file = %rel.display(), "lint clean");
    }
}
