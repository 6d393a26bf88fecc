// src/exec/tool.rs

//! External tool commands (transpiler, linter, minifiers, prefixer).
//!
//! A tool reads a file on stdin and writes the result on stdout. Commands run
//! through the platform shell so that users can configure pipelines and
//! `npx` invocations verbatim.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::runtime::{self, Handle};
use tracing::debug;

use crate::errors::ToolError;

/// Values substituted into a command template.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolVars<'a> {
    /// `{file}`: the source path, shell-quoted.
    pub file: Option<&'a Path>,
    /// `{browsers}`: the browser-support range, joined and shell-quoted.
    pub browsers: &'a [String],
    /// `{ruleset}`: lint rule set name.
    pub ruleset: &'a str,
}

/// Substitute placeholders into a command template.
pub fn render_command(template: &str, vars: &ToolVars<'_>) -> String {
    let file = vars
        .file
        .map(|p| shell_quote(&p.to_string_lossy()))
        .unwrap_or_default();

    template
        .replace("{file}", &file)
        .replace("{browsers}", &shell_quote(&vars.browsers.join(", ")))
        .replace("{ruleset}", vars.ruleset)
}

/// Run `command` in `cwd`, feeding `input` on stdin. Returns stdout on a zero
/// exit status.
pub fn run_tool(
    command: &str,
    input: &[u8],
    cwd: &Path,
    envs: &[(&str, String)],
) -> Result<Vec<u8>, ToolError> {
    let (stdout, stderr, code) = run_tool_raw(command, input, cwd, envs)?;
    if code != 0 {
        return Err(ToolError::Failed {
            tool: tool_name(command),
            code,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(stdout)
}

/// Like [`run_tool`] but hands back stdout, stderr and the exit status without
/// judging it. Linters exit non-zero when they find problems.
///
/// Task actions call this from tokio's blocking pool, where the ambient
/// runtime drives the child. Outside a runtime a current-thread one is built
/// for the call.
pub fn run_tool_raw(
    command: &str,
    input: &[u8],
    cwd: &Path,
    envs: &[(&str, String)],
) -> Result<(Vec<u8>, Vec<u8>, i32), ToolError> {
    let fut = run_tool_async(command, input, cwd, envs);
    match Handle::try_current() {
        Ok(handle) => handle.block_on(fut),
        Err(_) => runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ToolError::Spawn {
                tool: tool_name(command),
                source,
            })?
            .block_on(fut),
    }
}

async fn run_tool_async(
    command: &str,
    input: &[u8],
    cwd: &Path,
    envs: &[(&str, String)],
) -> Result<(Vec<u8>, Vec<u8>, i32), ToolError> {
    debug!(cmd = %command, cwd = %cwd.display(), "running tool");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let spawn_err = |source| ToolError::Spawn {
        tool: tool_name(command),
        source,
    };

    let mut child = cmd.spawn().map_err(spawn_err)?;

    // stdin is fed concurrently: a tool may write before it has read
    // everything.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            match written {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        })
    });

    let stderr_reader = child.stderr.take().map(|mut err| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf).await;
            buf
        })
    });

    let mut stdout = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout).await.map_err(spawn_err)?;
    }

    let status = child.wait().await.map_err(spawn_err)?;
    if let Some(writer) = writer {
        writer
            .await
            .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")))
            .map_err(spawn_err)?;
    }
    let stderr = match stderr_reader {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    Ok((stdout, stderr, status.code().unwrap_or(-1)))
}

/// First word of a command, used to name the tool in errors.
fn tool_name(command: &str) -> String {
    let mut words = command.split_whitespace();
    match words.next() {
        Some("npx") => words
            .find(|w| !w.starts_with('-'))
            .unwrap_or("npx")
            .to_string(),
        Some(first) => first.to_string(),
        None => String::new(),
    }
}

fn shell_quote(s: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
