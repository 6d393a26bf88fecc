// src/pipeline/select.rs

//! Glob-based source selection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::errors::TaskError;
use crate::paths::glob_base;
use crate::pipeline::SourceFile;

/// A set of include globs, negated globs (`!pattern`) and a dotfile switch,
/// all relative to a project root.
///
/// `*` does not cross directory separators; `**` does. Unless `dot` is set,
/// files under a hidden path component below the glob base are skipped.
#[derive(Debug, Clone)]
pub struct SourceSet {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    dot: bool,
}

/// A selected file: absolute path plus its path relative to the glob base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub rel: PathBuf,
}

impl SourceSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            dot: false,
        }
    }

    /// Add a pattern; a leading `!` makes it a negation.
    pub fn glob(mut self, pattern: impl AsRef<str>) -> Self {
        let pattern = pattern.as_ref();
        match pattern.strip_prefix('!') {
            Some(negated) => self.exclude.push(negated.to_string()),
            None => self.include.push(pattern.to_string()),
        }
        self
    }

    pub fn globs<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns.into_iter().fold(self, |set, p| set.glob(p))
    }

    pub fn dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    /// Resolve the globs to files, sorted by path, each selected once.
    pub fn files(&self) -> Result<Vec<SelectedFile>, TaskError> {
        let exclude = build_set(&self.exclude)?;
        let mut selected: BTreeMap<PathBuf, SelectedFile> = BTreeMap::new();

        for pattern in &self.include {
            let matcher = build_set(std::slice::from_ref(pattern))?;
            let base = glob_base(pattern);
            let dir = self.root.join(&base);
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir).follow_links(true) {
                let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let Some(rel_root) = rel_str(&self.root, path) else {
                    continue;
                };
                if !matcher.is_match(&rel_root) || exclude.is_match(&rel_root) {
                    continue;
                }

                let rel = path.strip_prefix(&dir).unwrap_or(path).to_path_buf();
                if !self.dot && is_hidden(&rel) {
                    continue;
                }

                selected
                    .entry(path.to_path_buf())
                    .or_insert_with(|| SelectedFile {
                        path: path.to_path_buf(),
                        rel,
                    });
            }
        }

        Ok(selected.into_values().collect())
    }

    /// Resolve and read every file.
    pub fn read(&self) -> Result<Vec<SourceFile>, TaskError> {
        self.files()?
            .into_iter()
            .map(|f| {
                let contents = std::fs::read(&f.path).map_err(|e| TaskError::io(&f.path, e))?;
                Ok(SourceFile::new(f.path, f.rel, contents))
            })
            .collect()
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, TaskError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().context("building glob set")?)
}

fn rel_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

fn is_hidden(rel: &Path) -> bool {
    rel.components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}
