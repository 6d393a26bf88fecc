// tests/config_loading.rs

use std::path::PathBuf;

use assetdag::config::{load_and_validate, load_or_default};
use assetdag::errors::PipelineError;
use assetdag::paths::{AssetClass, PathRegistry};
use assetdag::types::TriggerWhileRunningBehaviour;

fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Pipeline.toml");
    std::fs::write(&path, body).unwrap();
    (dir, path)
}

#[test]
fn missing_file_yields_the_scaffold_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("Pipeline.toml")).unwrap();

    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.project.dist_dir, PathBuf::from("dist"));
    assert_eq!(cfg.config.queue_length, 1);
    assert_eq!(
        cfg.config.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Queue
    );
    assert_eq!(cfg.lint.ruleset, "airbnb");
}

#[test]
fn sections_and_path_overrides_are_applied() {
    let (_dir, path) = write_config(
        r#"
[config]
triggered_while_running_behaviour = "cancel"
queue_length = 3

[server]
port = 8080
notify = true

[paths.styles]
input = "src/css/**/*.scss"
tmp = "build/tmp/css"

[wiredep]
exclude = ["jquery"]
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.config.queue_length, 3);
    assert_eq!(
        cfg.config.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
    assert_eq!(cfg.server.port, 8080);
    assert!(cfg.server.notify);
    assert_eq!(cfg.wiredep.exclude, vec!["jquery".to_string()]);

    let registry = PathRegistry::with_overrides(&cfg.paths);
    let styles = registry.get(AssetClass::Styles);
    assert_eq!(styles.input, "src/css/**/*.scss");
    assert_eq!(styles.tmp, PathBuf::from("build/tmp/css"));
    assert_eq!(styles.output, PathBuf::from("dist/styles"));
}

#[test]
fn zero_queue_length_is_rejected() {
    let (_dir, path) = write_config("[config]\nqueue_length = 0\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("queue_length")));
}

#[test]
fn reload_port_must_differ_from_the_server_port() {
    let (_dir, path) = write_config("[server]\nport = 4000\nreload_port = 4000\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("reload_port")));
}

#[test]
fn invalid_globs_and_regexes_are_rejected() {
    let (_dir, path) = write_config("[paths.scripts]\ninput = \"app/{scripts\"\n");
    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        PipelineError::ConfigError(_)
    ));

    let (_dir, path) = write_config("[wiredep]\nhtml_ignore_path = \"(\"\n");
    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        PipelineError::ConfigError(_)
    ));
}

#[test]
fn unknown_sections_and_classes_are_toml_errors() {
    let (_dir, path) = write_config("[plugins]\nfoo = 1\n");
    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        PipelineError::TomlError(_)
    ));

    let (_dir, path) = write_config("[paths.sounds]\ninput = \"app/**/*.mp3\"\n");
    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        PipelineError::TomlError(_)
    ));
}
