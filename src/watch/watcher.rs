// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::server::ReloadHandle;
use crate::watch::event_handler::process_event;
use crate::watch::patterns::{WatchRule, watch_targets};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher for `rules` under `root`.
///
/// Matching changes send `RuntimeEvent::TaskTriggered` into `runtime_tx`
/// or broadcast a reload through `reload`.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    rules: Vec<WatchRule>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    reload: ReloadHandle,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetdag: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("assetdag: file watch error: {err}"),
        },
        Config::default(),
    )?;

    for (dir, mode) in watch_targets(&root, &rules) {
        if !dir.exists() {
            warn!(dir = %dir.display(), "watch directory does not exist; skipping");
            continue;
        }
        watcher.watch(&dir, mode)?;
        debug!(dir = %dir.display(), ?mode, "watching");
    }

    info!(root = %root.display(), rules = rules.len(), "file watcher started");

    let rules = Arc::new(rules);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            if !process_event(&root, &event, &rules, &runtime_tx, &reload).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
