// src/context.rs

//! Per-process build context shared by every task action.

use std::path::{Path, PathBuf};

use crate::config::ConfigFile;
use crate::errors::TaskError;
use crate::paths::{AssetClass, AssetPaths, PathRegistry};
use crate::server::reload::ReloadHandle;
use crate::types::BuildMode;

/// Everything a task needs to know about the current invocation.
///
/// Built once before the first task starts and shared read-only (behind an
/// `Arc`) by all tasks of the process.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Project root; every configured path is relative to it.
    pub root: PathBuf,
    pub config: ConfigFile,
    pub paths: PathRegistry,
    pub mode: BuildMode,
    /// A dev server is attached (lint reports instead of failing).
    pub live: bool,
    pub reload: ReloadHandle,
}

impl BuildContext {
    pub fn new(root: impl Into<PathBuf>, config: ConfigFile, mode: BuildMode) -> Self {
        let paths = PathRegistry::with_overrides(&config.paths);
        Self {
            root: root.into(),
            config,
            paths,
            mode,
            live: false,
            reload: ReloadHandle::disabled(),
        }
    }

    /// Attach a dev server's reload channel; marks the context as live.
    pub fn with_reload(mut self, reload: ReloadHandle) -> Self {
        self.live = true;
        self.reload = reload;
        self
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn class(&self, class: AssetClass) -> &AssetPaths {
        self.paths.get(class)
    }

    /// Intermediate directory of `class`, resolved against the root.
    pub fn tmp_dir(&self, class: AssetClass) -> PathBuf {
        self.resolve(&self.class(class).tmp)
    }

    /// Output directory of `class`, resolved against the root.
    pub fn output_dir(&self, class: AssetClass) -> PathBuf {
        self.resolve(&self.class(class).output)
    }

    /// URL path under which a file of the intermediate tree is served.
    pub fn served_url(&self, file: &Path) -> String {
        let tmp_root = self.resolve(&self.config.project.tmp_dir);
        let rel = file.strip_prefix(&tmp_root).unwrap_or(file);
        format!("/{}", rel.to_string_lossy().replace('\\', "/"))
    }

    /// Write `contents` to `path`, creating parent directories.
    pub fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), TaskError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        std::fs::write(path, contents).map_err(|e| TaskError::io(path, e))
    }
}
