// src/bower.rs

//! Third-party component manifest (`bower.json`).
//!
//! Resolves the project's dependencies, transitively and dependencies
//! first, to the "main" files each installed component declares. The
//! project manifest's `overrides` table replaces a component's `main` or
//! `dependencies`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::errors::TaskError;
use crate::pipeline::SourceSet;

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    main: MainField,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    overrides: BTreeMap<String, Override>,
}

#[derive(Debug, Default, Deserialize)]
struct Override {
    main: Option<MainField>,
    dependencies: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
enum MainField {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl MainField {
    fn entries(&self) -> Vec<String> {
        match self {
            MainField::None => Vec::new(),
            MainField::One(s) => vec![s.clone()],
            MainField::Many(v) => v.clone(),
        }
    }
}

/// An installed component and its main files (relative to the project root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub files: Vec<PathBuf>,
}

/// Load the components the project depends on, dependencies first.
///
/// A project without a manifest has no components. Components that are
/// declared but not installed are skipped with a warning.
pub fn load_components(ctx: &BuildContext) -> Result<Vec<Component>, TaskError> {
    let manifest_path = ctx.resolve(&ctx.config.project.manifest);
    if !manifest_path.is_file() {
        debug!(path = %manifest_path.display(), "no component manifest");
        return Ok(Vec::new());
    }
    let project = read_manifest(&manifest_path)?;

    let mut resolver = Resolver {
        ctx,
        overrides: &project.overrides,
        visited: BTreeSet::new(),
        out: Vec::new(),
    };
    for name in project.dependencies.keys() {
        resolver.visit(name)?;
    }
    Ok(resolver.out)
}

/// Every main file of every component, in dependency order.
pub fn main_files(ctx: &BuildContext) -> Result<Vec<PathBuf>, TaskError> {
    Ok(load_components(ctx)?
        .into_iter()
        .flat_map(|c| c.files)
        .collect())
}

struct Resolver<'a> {
    ctx: &'a BuildContext,
    overrides: &'a BTreeMap<String, Override>,
    visited: BTreeSet<String>,
    out: Vec<Component>,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &str) -> Result<(), TaskError> {
        if !self.visited.insert(name.to_string()) {
            return Ok(());
        }

        let rel_dir = self.ctx.config.project.components_dir.join(name);
        let dir = self.ctx.resolve(&rel_dir);
        let Some(manifest) = installed_manifest(&dir)? else {
            warn!(component = name, dir = %dir.display(), "component is not installed");
            return Ok(());
        };

        let over = self.overrides.get(name);
        let deps = over
            .and_then(|o| o.dependencies.clone())
            .unwrap_or(manifest.dependencies);
        for dep in deps.keys() {
            self.visit(dep)?;
        }

        let main = over
            .and_then(|o| o.main.clone())
            .unwrap_or(manifest.main);
        let mut files = Vec::new();
        for entry in main.entries() {
            files.extend(self.expand(name, &rel_dir, &entry)?);
        }

        self.out.push(Component {
            name: name.to_string(),
            files,
        });
        Ok(())
    }

    fn expand(&self, name: &str, rel_dir: &Path, entry: &str) -> Result<Vec<PathBuf>, TaskError> {
        let entry = entry.trim_start_matches("./");
        let pattern = format!("{}/{entry}", rel_dir.to_string_lossy().replace('\\', "/"));

        if !entry.contains(['*', '?', '[', '{']) {
            if self.ctx.resolve(&pattern).is_file() {
                return Ok(vec![PathBuf::from(pattern)]);
            }
            warn!(component = name, file = %pattern, "main file is missing");
            return Ok(Vec::new());
        }

        let files = SourceSet::new(&self.ctx.root).glob(&pattern).files()?;
        Ok(files
            .into_iter()
            .filter_map(|f| f.path.strip_prefix(&self.ctx.root).ok().map(Path::to_path_buf))
            .collect())
    }
}

fn installed_manifest(dir: &Path) -> Result<Option<Manifest>, TaskError> {
    for file in [".bower.json", "bower.json"] {
        let path = dir.join(file);
        if path.is_file() {
            return read_manifest(&path).map(Some);
        }
    }
    Ok(None)
}

fn read_manifest(path: &Path) -> Result<Manifest, TaskError> {
    let text = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| TaskError::Manifest(format!("{}: {e}", path.display())))
}
