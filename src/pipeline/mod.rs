// src/pipeline/mod.rs

//! In-memory file pipelines.
//!
//! A task selects source files ([`select::SourceSet`]), runs each through an
//! ordered list of [`Transform`] stages and writes the result under a
//! destination directory, keeping the path relative to the glob base.
//!
//! - [`select`] turns globs (with negations) into source files.
//! - [`include`] resolves `@@include` directives.
//! - [`useref`] resolves `build:` bundle blocks in HTML.
//! - [`minify`] collapses HTML whitespace.

pub mod include;
pub mod minify;
pub mod select;
pub mod useref;

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, error};

use crate::context::BuildContext;
use crate::errors::{TaskError, TransformError};
use crate::exec::{ToolVars, render_command, run_tool};

pub use select::SourceSet;

/// A file travelling through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Where the file was read from (absolute, or relative to the root).
    pub path: PathBuf,
    /// Destination path relative to the sink directory.
    pub rel: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, rel: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            rel: rel.into(),
            contents,
        }
    }

    pub fn text(&self) -> Result<String, TransformError> {
        Ok(String::from_utf8(self.contents.clone())?)
    }

    pub fn file_name(&self) -> String {
        self.rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One pipeline stage.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, file: SourceFile, ctx: &BuildContext) -> Result<SourceFile, TransformError>;
}

/// Applies `inner` only to files whose name matches a glob (`*.js`).
pub struct Conditional {
    pattern: String,
    matcher: GlobMatcher,
    inner: Box<dyn Transform>,
}

impl Conditional {
    pub fn new(pattern: &str, inner: impl Transform + 'static) -> Result<Self, globset::Error> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            inner: Box::new(inner),
        })
    }
}

impl Transform for Conditional {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn apply(&self, file: SourceFile, ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        if self.matcher.is_match(file.file_name()) {
            self.inner.apply(file, ctx)
        } else {
            debug!(pattern = %self.pattern, file = %file.rel.display(), "stage skipped");
            Ok(file)
        }
    }
}

/// Pipes file contents through an external command.
pub struct ToolTransform {
    name: String,
    command: String,
    envs: Vec<(&'static str, String)>,
}

impl ToolTransform {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            envs: Vec::new(),
        }
    }

    pub fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.envs.push((key, value.into()));
        self
    }
}

impl Transform for ToolTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, mut file: SourceFile, ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        let vars = ToolVars {
            file: Some(&file.path),
            browsers: &ctx.config.styles.browsers,
            ruleset: &ctx.config.lint.ruleset,
        };
        let command = render_command(&self.command, &vars);
        file.contents = run_tool(&command, &file.contents, &ctx.root, &self.envs)?;
        Ok(file)
    }
}

/// Result of running a pipeline over a set of files.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    /// Files written, in processing order.
    pub written: Vec<PathBuf>,
    pub failed: usize,
    pub total: usize,
}

impl PipelineOutput {
    /// Fail when any file failed; the successful ones have been written.
    pub fn into_result(self) -> Result<Vec<PathBuf>, TaskError> {
        if self.failed > 0 {
            return Err(TaskError::Transform {
                failed: self.failed,
                total: self.total,
            });
        }
        Ok(self.written)
    }
}

/// Ordered list of stages applied to each file in turn.
pub struct Pipeline {
    task: String,
    stages: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn named(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: impl Transform + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run every stage over one file.
    pub fn process(&self, file: SourceFile, ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        self.stages
            .iter()
            .try_fold(file, |file, stage| stage.apply(file, ctx))
    }

    /// Process and write every file under `dest`.
    ///
    /// A file that fails a stage is logged and skipped; the others are still
    /// written. Write errors abort the task.
    pub fn run(
        &self,
        files: Vec<SourceFile>,
        dest: &Path,
        ctx: &BuildContext,
    ) -> Result<PipelineOutput, TaskError> {
        let mut output = PipelineOutput {
            total: files.len(),
            ..PipelineOutput::default()
        };

        for file in files {
            let source = file.path.clone();
            match self.process(file, ctx) {
                Ok(done) => {
                    let target = dest.join(&done.rel);
                    ctx.write_file(&target, &done.contents)?;
                    debug!(task = %self.task, path = %target.display(), "wrote");
                    output.written.push(target);
                }
                Err(err) => {
                    error!(
                        task = %self.task,
                        path = %source.display(),
                        error = %err,
                        "transform failed"
                    );
                    output.failed += 1;
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::types::BuildMode;

    struct Upper;

    impl Transform for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn apply(&self, mut file: SourceFile, _ctx: &BuildContext) -> Result<SourceFile, TransformError> {
            let text = file.text()?;
            if text.contains("bad") {
                return Err(TransformError::Tool(crate::errors::ToolError::Failed {
                    tool: "upper".into(),
                    code: 1,
                    stderr: "bad input".into(),
                }));
            }
            file.contents = text.to_uppercase().into_bytes();
            Ok(file)
        }
    }

    #[test]
    fn conditional_applies_only_to_matching_names() {
        let ctx = BuildContext::new(".", ConfigFile::default(), BuildMode::Development);
        let stage = Conditional::new("*.js", Upper).unwrap();

        let js = stage
            .apply(SourceFile::new("a.js", "scripts/a.js", b"x".to_vec()), &ctx)
            .unwrap();
        assert_eq!(js.contents, b"X");

        let css = stage
            .apply(SourceFile::new("a.css", "styles/a.css", b"x".to_vec()), &ctx)
            .unwrap();
        assert_eq!(css.contents, b"x");
    }

    #[test]
    fn failing_file_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = BuildContext::new(dir.path(), ConfigFile::default(), BuildMode::Development);
        let dest = dir.path().join("out");

        let files = vec![
            SourceFile::new("a.txt", "a.txt", b"good".to_vec()),
            SourceFile::new("b.txt", "nested/b.txt", b"bad".to_vec()),
            SourceFile::new("c.txt", "c.txt", b"fine".to_vec()),
        ];
        let output = Pipeline::named("test").stage(Upper).run(files, &dest, &ctx).unwrap();

        assert_eq!(output.failed, 1);
        assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"GOOD");
        assert_eq!(std::fs::read(dest.join("c.txt")).unwrap(), b"FINE");
        assert!(!dest.join("nested/b.txt").exists());
        assert!(matches!(
            output.into_result(),
            Err(TaskError::Transform { failed: 1, total: 3 })
        ));
    }
}
