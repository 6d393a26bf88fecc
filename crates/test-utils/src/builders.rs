#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::config::{ConfigFile, RawConfigFile};
use assetdag::context::BuildContext;
use assetdag::errors::TaskError;
use assetdag::server::ReloadHandle;
use assetdag::tasks::TaskRegistry;
use assetdag::types::BuildMode;
use tempfile::TempDir;

/// A throwaway project tree.
pub struct TestProject {
    dir: TempDir,
    config: ConfigFile,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project"),
            config: ConfigFile::default(),
        }
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    /// Replace the configuration with one parsed from TOML.
    pub fn config_toml(mut self, toml: &str) -> Self {
        let raw: RawConfigFile = toml::from_str(toml).expect("valid test config TOML");
        self.config = ConfigFile::try_from(raw).expect("valid test config");
        self
    }

    /// Adjust the configuration in place (for values TOML cannot express,
    /// like unsetting an optional command).
    pub fn configure(mut self, f: impl FnOnce(&mut ConfigFile)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn ctx(&self, mode: BuildMode) -> BuildContext {
        BuildContext::new(self.dir.path(), self.config.clone(), mode)
    }

    /// A context with a dev server attached (reload messages are dropped).
    pub fn live_ctx(&self, mode: BuildMode) -> BuildContext {
        let (tx, _rx) = std::sync::mpsc::channel();
        self.ctx(mode).with_reload(ReloadHandle::from_sender(tx))
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// What a recording action observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Started(String),
    Finished(String),
}

/// Shared log of task starts and finishes.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    marks: Arc<Mutex<Vec<Mark>>>,
}

impl Recorder {
    pub fn marks(&self) -> Vec<Mark> {
        self.marks.lock().unwrap().clone()
    }

    fn push(&self, mark: Mark) {
        self.marks.lock().unwrap().push(mark);
    }

    pub fn started(&self, task: &str) -> bool {
        self.marks().contains(&Mark::Started(task.to_string()))
    }

    /// Position of a mark in the log.
    pub fn position(&self, mark: &Mark) -> Option<usize> {
        self.marks().iter().position(|m| m == mark)
    }
}

/// Builder for registries of recording test actions.
pub struct RegistryBuilder {
    registry: TaskRegistry,
    recorder: Recorder,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            recorder: Recorder::default(),
        }
    }

    /// A task that succeeds after `delay`.
    pub fn task(self, name: &str, deps: &[&str], delay: Duration) -> Self {
        self.action(name, deps, delay, None)
    }

    /// A task that fails with `message` after `delay`.
    pub fn failing(self, name: &str, deps: &[&str], delay: Duration, message: &str) -> Self {
        self.action(name, deps, delay, Some(message.to_string()))
    }

    fn action(mut self, name: &str, deps: &[&str], delay: Duration, failure: Option<String>) -> Self {
        let recorder = self.recorder.clone();
        let task = name.to_string();
        self.registry.register(name, deps, move |_: &BuildContext| {
            recorder.push(Mark::Started(task.clone()));
            std::thread::sleep(delay);
            recorder.push(Mark::Finished(task.clone()));
            match &failure {
                Some(message) => Err(TaskError::Other(anyhow::anyhow!(message.clone()))),
                None => Ok(()),
            }
        });
        self
    }

    pub fn build(self) -> (TaskRegistry, Recorder) {
        (self.registry, self.recorder)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
