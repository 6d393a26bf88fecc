// src/watch/patterns.rs

//! Watch rules: which globs re-run which tasks.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::RecursiveMode;

use crate::context::BuildContext;
use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::paths::{AssetClass, glob_base};

/// What a matching change does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Trigger these tasks (and, through the graph, their predecessors).
    Tasks(Vec<TaskName>),
    /// Tell connected pages to reload.
    Reload,
}

/// A compiled watch rule.
#[derive(Debug, Clone)]
pub struct WatchRule {
    patterns: Vec<String>,
    globs: GlobSet,
    action: WatchAction,
}

impl WatchRule {
    pub fn new<S: AsRef<str>>(patterns: &[S], action: WatchAction) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = GlobBuilder::new(pat.as_ref())
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    PipelineError::ConfigError(format!("invalid watch pattern '{}': {e}", pat.as_ref()))
                })?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| PipelineError::ConfigError(format!("failed to build watch globset: {e}")))?;

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            globs,
            action,
        })
    }

    pub fn tasks<S: AsRef<str>>(patterns: &[S], tasks: &[&str]) -> Result<Self> {
        Self::new(
            patterns,
            WatchAction::Tasks(tasks.iter().map(|t| t.to_string()).collect()),
        )
    }

    pub fn reload<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Self::new(patterns, WatchAction::Reload)
    }

    /// `rel_path` is relative to the project root, with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.globs.is_match(rel_path)
    }

    pub fn action(&self) -> &WatchAction {
        &self.action
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn input(ctx: &BuildContext, class: AssetClass) -> String {
    ctx.class(class).input.clone()
}

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Rules of the `serve` entry.
pub fn serve_rules(ctx: &BuildContext) -> Result<Vec<WatchRule>> {
    let html = input(ctx, AssetClass::Html);
    let scripts = input(ctx, AssetClass::Scripts);
    let styles = input(ctx, AssetClass::Styles);
    let images = input(ctx, AssetClass::Images);
    let fonts = input(ctx, AssetClass::Fonts);
    let manifest = slash(&ctx.config.project.manifest);

    Ok(vec![
        WatchRule::tasks(&[&html], &["fileinclude"])?,
        WatchRule::tasks(&[&scripts], &["fileinclude", "scripts"])?,
        WatchRule::reload(&[&html, &images, &fonts])?,
        WatchRule::tasks(&[&styles], &["styles"])?,
        WatchRule::tasks(&[&fonts], &["fonts"])?,
        WatchRule::tasks(&[&manifest], &["wiredep", "fonts"])?,
    ])
}

/// Rules of the `serve:test` entry.
pub fn test_rules(ctx: &BuildContext) -> Result<Vec<WatchRule>> {
    let scripts = input(ctx, AssetClass::Scripts);
    let spec = format!("{}/**/*.js", slash(&ctx.config.lint.test_spec_dir));
    let index = format!("{}/index.html", slash(&ctx.config.project.test_dir));

    Ok(vec![
        WatchRule::tasks(&[&scripts], &["scripts"])?,
        WatchRule::reload(&[&spec, &index])?,
        WatchRule::tasks(&[&spec], &["lint:test"])?,
    ])
}

/// Directories to register with the OS watcher for `rules`.
///
/// Wildcard patterns watch their glob base recursively; literal files watch
/// their parent directory only. Recursive entries nested in another
/// recursive entry are dropped.
pub fn watch_targets(root: &Path, rules: &[WatchRule]) -> Vec<(PathBuf, RecursiveMode)> {
    let mut recursive = BTreeSet::new();
    let mut flat = BTreeSet::new();

    for pattern in rules.iter().flat_map(|r| r.patterns()) {
        let base = root.join(glob_base(pattern));
        if pattern.contains(['*', '?', '[', '{']) {
            recursive.insert(base);
        } else {
            flat.insert(base);
        }
    }

    let recursive: Vec<PathBuf> = recursive
        .iter()
        .filter(|p| !recursive.iter().any(|q| q != *p && p.starts_with(q)))
        .cloned()
        .collect();
    let flat = flat
        .into_iter()
        .filter(|p| !recursive.iter().any(|q| p.starts_with(q)));

    recursive
        .iter()
        .cloned()
        .map(|p| (p, RecursiveMode::Recursive))
        .chain(flat.map(|p| (p, RecursiveMode::NonRecursive)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::types::BuildMode;

    fn ctx() -> BuildContext {
        BuildContext::new("/p", ConfigFile::default(), BuildMode::Development)
    }

    fn triggered(rules: &[WatchRule], path: &str) -> Vec<WatchAction> {
        rules
            .iter()
            .filter(|r| r.matches(path))
            .map(|r| r.action().clone())
            .collect()
    }

    #[test]
    fn serve_rules_bind_sources_to_tasks() {
        let rules = serve_rules(&ctx()).unwrap();

        assert_eq!(
            triggered(&rules, "app/styles/main.scss"),
            vec![WatchAction::Tasks(vec!["styles".into()])]
        );
        assert_eq!(
            triggered(&rules, "app/index.html"),
            vec![
                WatchAction::Tasks(vec!["fileinclude".into()]),
                WatchAction::Reload
            ]
        );
        assert_eq!(
            triggered(&rules, "bower.json"),
            vec![WatchAction::Tasks(vec!["wiredep".into(), "fonts".into()])]
        );
        assert!(triggered(&rules, ".tmp/styles/main.css").is_empty());
    }

    #[test]
    fn test_rules_relint_specs() {
        let rules = test_rules(&ctx()).unwrap();
        assert_eq!(
            triggered(&rules, "test/spec/main.js"),
            vec![
                WatchAction::Reload,
                WatchAction::Tasks(vec!["lint:test".into()])
            ]
        );
    }

    #[test]
    fn targets_collapse_nested_directories() {
        let rules = serve_rules(&ctx()).unwrap();
        let targets = watch_targets(Path::new("/p"), &rules);
        assert_eq!(
            targets,
            vec![
                (PathBuf::from("/p/app"), RecursiveMode::Recursive),
                (PathBuf::from("/p"), RecursiveMode::NonRecursive),
            ]
        );
    }
}
