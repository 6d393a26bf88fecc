// src/watch/event_handler.rs

//! Turning filesystem events into task triggers and reloads.

use std::collections::BTreeSet;
use std::path::Path;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::server::ReloadHandle;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{WatchAction, WatchRule};

/// What one event asks for, after matching every path against every rule.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EventEffects {
    pub tasks: BTreeSet<TaskName>,
    pub reload: bool,
}

/// Match the paths of `event` against `rules`. Access-only events have no
/// effect.
pub fn effects_of(root: &Path, event: &Event, rules: &[WatchRule]) -> EventEffects {
    let mut effects = EventEffects::default();
    if matches!(event.kind, EventKind::Access(_)) {
        return effects;
    }

    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            warn!(?path, ?root, "could not relativize event path");
            continue;
        };

        for rule in rules.iter().filter(|r| r.matches(&rel)) {
            debug!(rel = %rel, action = ?rule.action(), "watch match");
            match rule.action() {
                WatchAction::Tasks(tasks) => effects.tasks.extend(tasks.iter().cloned()),
                WatchAction::Reload => effects.reload = true,
            }
        }
    }
    effects
}

/// Apply the effects of one event. Returns `false` once the runtime has gone
/// away.
pub async fn process_event(
    root: &Path,
    event: &Event,
    rules: &[WatchRule],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    reload: &ReloadHandle,
) -> bool {
    let effects = effects_of(root, event, rules);

    for task in effects.tasks {
        debug!(task = %task, "watch match -> triggering task");
        let sent = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await;
        if let Err(err) = sent {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    if effects.reload {
        reload.reload();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use std::path::PathBuf;

    fn rules() -> Vec<WatchRule> {
        vec![
            WatchRule::tasks(&["app/**/*.html"], &["fileinclude"]).unwrap(),
            WatchRule::tasks(&["app/scripts/**/*.js"], &["fileinclude", "scripts"]).unwrap(),
            WatchRule::reload(&["app/**/*.html"]).unwrap(),
        ]
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from("/p").join(p));
        }
        event
    }

    #[test]
    fn tasks_are_deduplicated_within_an_event() {
        let ev = event(
            EventKind::Modify(ModifyKind::Any),
            &["app/index.html", "app/scripts/main.js"],
        );
        let effects = effects_of(Path::new("/p"), &ev, &rules());
        assert_eq!(
            effects.tasks.into_iter().collect::<Vec<_>>(),
            vec!["fileinclude", "scripts"]
        );
        assert!(effects.reload);
    }

    #[test]
    fn access_events_are_ignored() {
        let ev = event(EventKind::Access(AccessKind::Any), &["app/index.html"]);
        assert_eq!(effects_of(Path::new("/p"), &ev, &rules()), EventEffects::default());
    }

    #[tokio::test]
    async fn matched_tasks_reach_the_runtime() {
        let (tx, mut rx) = mpsc::channel(8);
        let ev = event(EventKind::Create(CreateKind::File), &["app/scripts/new.js"]);

        assert!(process_event(Path::new("/p"), &ev, &rules(), &tx, &ReloadHandle::disabled()).await);

        let mut triggered = Vec::new();
        while let Ok(RuntimeEvent::TaskTriggered { task, reason }) = rx.try_recv() {
            assert_eq!(reason, TriggerReason::FileWatch);
            triggered.push(task);
        }
        assert_eq!(triggered, vec!["fileinclude", "scripts"]);
    }
}
