// tests/scheduler_property.rs
//
// Random acyclic task graphs driven to completion by hand.

use std::collections::{BTreeSet, VecDeque};

use proptest::prelude::*;

use assetdag::dag::{DagGraph, Scheduler, TaskRunState};
use assetdag::engine::TaskOutcome;

#[derive(Debug, Clone)]
struct Case {
    /// `deps[i]` only names tasks with a lower index.
    deps: Vec<Vec<usize>>,
    failing: BTreeSet<usize>,
    target: usize,
    /// A second trigger merged into the run after `late_after` completions.
    late: usize,
    late_after: usize,
}

fn name(i: usize) -> String {
    format!("t{i}")
}

fn case() -> impl Strategy<Value = Case> {
    (1usize..10)
        .prop_flat_map(|n| {
            let deps = (0..n)
                .map(|i| proptest::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i.min(3)))
                .collect::<Vec<_>>();
            let failing = proptest::collection::btree_set(0..n, 0..=n.min(2));
            (deps, failing, 0..n, 0..n, 0..=n)
        })
        .prop_map(|(deps, failing, target, late, late_after)| Case {
            deps,
            failing,
            target,
            late,
            late_after,
        })
}

fn graph(case: &Case) -> DagGraph {
    let tasks: Vec<(String, Vec<String>)> = case
        .deps
        .iter()
        .enumerate()
        .map(|(i, d)| (name(i), d.iter().map(|&j| name(j)).collect()))
        .collect();
    DagGraph::build(tasks.iter().map(|(n, d)| (n.as_str(), d.as_slice())))
        .expect("graph is acyclic by construction")
}

fn closure(deps: &[Vec<usize>], target: usize) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![target];
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(deps[i].iter().copied());
        }
    }
    seen.into_iter().map(name).collect()
}

proptest! {
    #[test]
    fn runs_terminate_and_respect_dependencies(case in case()) {
        let mut scheduler = Scheduler::new(graph(&case));

        let mut ready: VecDeque<String> = VecDeque::new();
        let mut dispatched: BTreeSet<String> = BTreeSet::new();
        let mut succeeded: BTreeSet<String> = BTreeSet::new();

        let step = scheduler.step_trigger(&name(case.target));
        let participating: BTreeSet<String> = scheduler.tasks_in_current_run().into_iter().collect();
        prop_assert_eq!(&participating, &closure(&case.deps, case.target));
        ready.extend(step.newly_scheduled.into_iter().map(|t| t.name));
        let mut report = step.finished;

        let mut steps = 0;
        while report.is_none() {
            steps += 1;
            prop_assert!(steps <= case.deps.len() + 1, "run did not terminate");

            let task = ready.pop_front().expect("an unfinished run has a ready task");
            prop_assert!(dispatched.insert(task.clone()), "{task} dispatched twice");

            let index: usize = task[1..].parse().unwrap();
            for &dep in &case.deps[index] {
                prop_assert!(succeeded.contains(&name(dep)), "{task} ran before {}", name(dep));
            }

            let outcome = if case.failing.contains(&index) {
                TaskOutcome::Failed("boom".into())
            } else {
                succeeded.insert(task.clone());
                TaskOutcome::Success
            };
            let step = scheduler.step_completion(&task, outcome);
            ready.extend(step.newly_scheduled.into_iter().map(|t| t.name));
            report = step.finished;
        }

        let report = report.unwrap();
        prop_assert!(ready.is_empty());
        prop_assert!(scheduler.is_idle());

        let reported: BTreeSet<String> = report
            .succeeded
            .iter()
            .cloned()
            .chain(report.failed.iter().map(|(t, _)| t.clone()))
            .chain(report.blocked.iter().cloned())
            .collect();
        let expected = closure(&case.deps, case.target);
        prop_assert_eq!(&reported, &expected);

        let all_ok = expected.iter().all(|t| {
            let i: usize = t[1..].parse().unwrap();
            !case.failing.contains(&i)
        });
        prop_assert_eq!(report.is_success(), all_ok);
    }

    #[test]
    fn late_triggers_merge_into_a_run_even_after_failures(case in case()) {
        let mut scheduler = Scheduler::new(graph(&case));

        let mut ready: VecDeque<String> = VecDeque::new();
        let mut dispatched: BTreeSet<String> = BTreeSet::new();
        let mut succeeded: BTreeSet<String> = BTreeSet::new();
        let mut expected = closure(&case.deps, case.target);

        let step = scheduler.step_trigger(&name(case.target));
        ready.extend(step.newly_scheduled.into_iter().map(|t| t.name));
        let mut report = step.finished;

        let mut completions = 0;
        let mut merged = false;
        while report.is_none() {
            if !merged && completions >= case.late_after {
                merged = true;
                let late = name(case.late);
                if scheduler.run_state_of(&late) == Some(TaskRunState::NotInRun) {
                    expected.extend(closure(&case.deps, case.late));
                    let step = scheduler.step_trigger(&late);
                    ready.extend(step.newly_scheduled.into_iter().map(|t| t.name));
                    report = step.finished;
                    continue;
                }
            }

            prop_assert!(completions <= case.deps.len(), "run did not terminate");
            let task = ready.pop_front().expect("an unfinished run has a ready task");
            prop_assert!(dispatched.insert(task.clone()), "{task} dispatched twice");

            let index: usize = task[1..].parse().unwrap();
            for &dep in &case.deps[index] {
                prop_assert!(succeeded.contains(&name(dep)), "{task} ran before {}", name(dep));
            }

            let outcome = if case.failing.contains(&index) {
                TaskOutcome::Failed("boom".into())
            } else {
                succeeded.insert(task.clone());
                TaskOutcome::Success
            };
            completions += 1;
            let step = scheduler.step_completion(&task, outcome);
            ready.extend(step.newly_scheduled.into_iter().map(|t| t.name));
            report = step.finished;
        }

        let report = report.unwrap();
        prop_assert!(ready.is_empty());
        prop_assert!(scheduler.is_idle());

        let reported: BTreeSet<String> = report
            .succeeded
            .iter()
            .cloned()
            .chain(report.failed.iter().map(|(t, _)| t.clone()))
            .chain(report.blocked.iter().cloned())
            .collect();
        prop_assert_eq!(&reported, &expected);
    }
}
