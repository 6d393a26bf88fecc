// tests/lint_policy.rs
//
// Lint failure policy with stand-in linter commands that print canned
// ESLint JSON.
#![cfg(unix)]

use assetdag::errors::TaskError;
use assetdag::tasks::lint;
use assetdag::types::BuildMode;
use assetdag_test_utils::builders::TestProject;
use assetdag_test_utils::init_tracing;

const CLEAN: &str = r#"[{"filePath":"<text>","messages":[],"errorCount":0,"warningCount":0}]"#;

const ERRORS: &str = r#"[{"filePath":"<text>","messages":[
  {"ruleId":"no-undef","severity":2,"message":"'b' is not defined.","line":2,"column":1}
],"errorCount":1,"warningCount":0,"output":"let a = 1;\nb;\n"}]"#;

fn project(linter: &str) -> TestProject {
    let command = linter.to_string();
    TestProject::new()
        .file("app/scripts/main.js", "let a = 1\nb;\n")
        .file("lint/clean.json", CLEAN)
        .file("lint/errors.json", ERRORS)
        .configure(move |cfg| cfg.lint.command = command)
}

#[test]
fn clean_sources_pass_in_every_mode() {
    init_tracing();
    let project = project("cat lint/clean.json");

    lint::run(&project.ctx(BuildMode::Production)).unwrap();
    lint::run(&project.live_ctx(BuildMode::Development)).unwrap();
}

#[test]
fn errors_fail_a_build_without_a_server() {
    init_tracing();
    let project = project("cat lint/errors.json; exit 1");

    let err = lint::run(&project.ctx(BuildMode::Production)).unwrap_err();
    assert!(matches!(err, TaskError::Lint { errors: 1 }), "{err:?}");
}

#[test]
fn errors_are_only_reported_while_serving() {
    init_tracing();
    let project = project("cat lint/errors.json; exit 1");

    lint::run(&project.live_ctx(BuildMode::Development)).unwrap();
}

#[test]
fn a_crashing_linter_fails_the_task() {
    init_tracing();
    let project = project("echo 'Oops! Something went wrong' >&2; exit 2");

    let err = lint::run(&project.live_ctx(BuildMode::Development)).unwrap_err();
    assert!(matches!(err, TaskError::Transform { failed: 1, total: 1 }), "{err:?}");
}

#[test]
fn lint_test_writes_fixed_copies_into_the_spec_dir() {
    init_tracing();
    let project = project("cat lint/errors.json; exit 1");

    lint::run_test(&project.ctx(BuildMode::Development)).unwrap();

    assert_eq!(project.read("test/spec/main.js"), "let a = 1;\nb;\n");
}

#[test]
fn lint_test_copies_sources_without_fixes_verbatim() {
    init_tracing();
    let project = project("cat lint/clean.json");

    lint::run_test(&project.ctx(BuildMode::Development)).unwrap();

    assert_eq!(project.read("test/spec/main.js"), "let a = 1\nb;\n");
}
