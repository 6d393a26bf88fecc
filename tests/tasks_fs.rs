// tests/tasks_fs.rs
//
// Built-in task actions run against throwaway project trees. External tools
// are switched off so that only in-process stages run.

use assetdag::config::ConfigFile;
use assetdag::errors::TaskError;
use assetdag::tasks::{clean, extras, fileinclude, fonts, html, styles, wiredep};
use assetdag::types::BuildMode;
use assetdag_test_utils::builders::TestProject;
use assetdag_test_utils::init_tracing;

fn no_tools(cfg: &mut ConfigFile) {
    cfg.styles.prefixer = None;
    cfg.html.js_minifier = None;
    cfg.html.css_minifier = None;
}

#[test]
fn clean_removes_both_trees_and_tolerates_missing_ones() {
    init_tracing();
    let project = TestProject::new()
        .file(".tmp/styles/main.css", "a{}")
        .file("dist/index.html", "<p>")
        .file("app/index.html", "<p>");
    let ctx = project.ctx(BuildMode::Production);

    clean::run(&ctx).unwrap();
    assert!(!project.exists(".tmp"));
    assert!(!project.exists("dist"));
    assert!(project.exists("app/index.html"));

    clean::run(&ctx).unwrap();
}

#[test]
fn styles_compile_entry_points_but_not_partials() {
    init_tracing();
    let project = TestProject::new()
        .configure(no_tools)
        .file("app/styles/_colors.scss", "$accent: #ff0000;\n")
        .file(
            "app/styles/main.scss",
            "@import \"colors\";\nbody { color: $accent; }\n",
        )
        .file("app/styles/pages/about.scss", "p { margin: 0; }\n");

    styles::run(&project.ctx(BuildMode::Development)).unwrap();

    let css = project.read(".tmp/styles/main.css");
    assert!(css.contains("color: #ff0000"), "{css}");
    assert!(project.exists(".tmp/styles/pages/about.css"));
    assert!(!project.exists(".tmp/styles/_colors.css"));
}

#[test]
fn styles_end_with_an_inline_source_map() {
    init_tracing();
    let project = TestProject::new()
        .configure(no_tools)
        .file("app/styles/main.scss", "$c: red; body { color: $c; }\n");

    styles::run(&project.ctx(BuildMode::Development)).unwrap();

    let css = project.read(".tmp/styles/main.css");
    assert!(css.contains("color: red"), "{css}");
    let last = css.trim_end().lines().last().unwrap_or_default();
    assert!(
        last.starts_with("/*# sourceMappingURL=data:application/json;charset=utf-8;base64,"),
        "{css}"
    );
}

#[test]
fn styles_with_a_syntax_error_write_the_other_files_then_fail() {
    init_tracing();
    let project = TestProject::new()
        .configure(no_tools)
        .file("app/styles/broken.scss", "body { color: $undefined; }\n")
        .file("app/styles/ok.scss", "a { color: blue; }\n");

    let err = styles::run(&project.ctx(BuildMode::Development)).unwrap_err();

    assert!(matches!(err, TaskError::Transform { failed: 1, total: 2 }), "{err:?}");
    assert!(project.exists(".tmp/styles/ok.css"));
    assert!(!project.exists(".tmp/styles/broken.css"));
}

fn font_project() -> TestProject {
    TestProject::new()
        .file("bower.json", r#"{"dependencies": {"icons": "^1"}}"#)
        .file(
            "bower_components/icons/bower.json",
            r#"{"main": ["css/icons.css", "fonts/icons.woff", "fonts/icons.eot"]}"#,
        )
        .file("bower_components/icons/css/icons.css", ".i{}")
        .file("bower_components/icons/fonts/icons.woff", "woff")
        .file("bower_components/icons/fonts/icons.eot", "eot")
        .file("app/fonts/local.ttf", "ttf")
}

#[test]
fn fonts_go_to_the_output_tree_in_production() {
    init_tracing();
    let project = font_project();

    fonts::run(&project.ctx(BuildMode::Production)).unwrap();

    assert_eq!(project.read("dist/fonts/icons.woff"), "woff");
    assert_eq!(project.read("dist/fonts/icons.eot"), "eot");
    assert_eq!(project.read("dist/fonts/local.ttf"), "ttf");
    assert!(!project.exists("dist/fonts/icons.css"));
    assert!(!project.exists(".tmp/fonts"));
}

#[test]
fn fonts_go_to_the_intermediate_tree_in_development() {
    init_tracing();
    let project = font_project();

    fonts::run(&project.ctx(BuildMode::Development)).unwrap();

    assert!(project.exists(".tmp/fonts/icons.woff"));
    assert!(project.exists(".tmp/fonts/local.ttf"));
    assert!(!project.exists("dist"));
}

#[test]
fn component_fonts_with_glob_characters_in_their_names_are_copied() {
    init_tracing();
    let project = TestProject::new()
        .file("bower.json", r#"{"dependencies": {"icons": "^1"}}"#)
        .file(
            "bower_components/icons/bower.json",
            r#"{"main": ["fonts/*.woff"]}"#,
        )
        .file("bower_components/icons/fonts/icons[1].woff", "bracketed")
        .file("bower_components/icons/fonts/icons1.woff", "plain");

    fonts::run(&project.ctx(BuildMode::Production)).unwrap();

    assert_eq!(project.read("dist/fonts/icons[1].woff"), "bracketed");
    assert_eq!(project.read("dist/fonts/icons1.woff"), "plain");
}

#[test]
fn extras_copy_top_level_files_including_dotfiles() {
    init_tracing();
    let project = TestProject::new()
        .file("app/robots.txt", "User-agent: *")
        .file("app/.htaccess", "Options -Indexes")
        .file("app/index.html", "<p>")
        .file("app/scripts/main.js", "x");

    extras::run(&project.ctx(BuildMode::Production)).unwrap();

    assert_eq!(project.read("dist/robots.txt"), "User-agent: *");
    assert!(project.exists("dist/.htaccess"));
    assert!(!project.exists("dist/index.html"));
    assert!(!project.exists("dist/scripts/main.js"));
}

#[test]
fn fileinclude_expands_partials_with_their_context() {
    init_tracing();
    let project = TestProject::new()
        .file(
            "app/index.html",
            "<head>@@include('partials/head.html', {\"title\": \"Home\"})</head>",
        )
        .file("app/partials/head.html", "<title>@@title</title>");

    fileinclude::run(&project.live_ctx(BuildMode::Development)).unwrap();

    assert_eq!(project.read(".tmp/index.html"), "<head><title>Home</title></head>");
}

#[test]
fn fileinclude_reports_a_missing_partial() {
    init_tracing();
    let project = TestProject::new().file("app/index.html", "@@include('nope.html')");

    let err = fileinclude::run(&project.ctx(BuildMode::Development)).unwrap_err();
    assert!(matches!(err, TaskError::Transform { failed: 1, .. }), "{err:?}");
}

fn wired_project() -> TestProject {
    TestProject::new()
        .file(
            "bower.json",
            r#"{"dependencies": {"normalize": "*", "widget": "*"}}"#,
        )
        .file("bower_components/normalize/bower.json", r#"{"main": "normalize.css"}"#)
        .file("bower_components/normalize/normalize.css", "html{}")
        .file(
            "bower_components/widget/.bower.json",
            r#"{"main": ["widget.js", "_widget.scss"], "dependencies": {"normalize": "*"}}"#,
        )
        .file("bower_components/widget/widget.js", "var w;")
        .file("bower_components/widget/_widget.scss", ".w{}")
        .file(
            "app/styles/main.scss",
            "// bower:scss\n// endbower\nbody {}\n",
        )
        .file(
            "app/index.html",
            "<head>\n  <!-- bower:css -->\n  <!-- endbower -->\n</head>\n<body>\n  <!-- bower:js -->\n  <!-- endbower -->\n</body>\n",
        )
}

#[test]
fn wiredep_injects_component_files_into_styles_and_pages() {
    init_tracing();
    let project = wired_project();

    wiredep::run(&project.ctx(BuildMode::Development)).unwrap();

    assert_eq!(
        project.read("app/styles/main.scss"),
        "// bower:scss\n@import \"bower_components/widget/_widget.scss\";\n// endbower\nbody {}\n"
    );
    let page = project.read("app/index.html");
    assert!(
        page.contains(
            "  <!-- bower:css -->\n  <link rel=\"stylesheet\" href=\"/bower_components/normalize/normalize.css\" />\n  <!-- endbower -->"
        ),
        "{page}"
    );
    assert!(
        page.contains("<script src=\"/bower_components/widget/widget.js\"></script>"),
        "{page}"
    );
}

#[test]
fn wiredep_exclusions_only_apply_to_pages() {
    init_tracing();
    let project = wired_project().configure(|cfg| cfg.wiredep.exclude = vec!["widget".into()]);

    wiredep::run(&project.ctx(BuildMode::Development)).unwrap();

    assert!(project.read("app/styles/main.scss").contains("_widget.scss"));
    let page = project.read("app/index.html");
    assert!(!page.contains("widget.js"), "{page}");
    assert!(page.contains("normalize.css"), "{page}");
}

#[test]
fn wiredep_is_idempotent() {
    init_tracing();
    let project = wired_project();
    let ctx = project.ctx(BuildMode::Development);

    wiredep::run(&ctx).unwrap();
    let once = project.read("app/index.html");
    wiredep::run(&ctx).unwrap();
    assert_eq!(project.read("app/index.html"), once);
}

const PAGE: &str = r#"<html>
<head>
<!-- build:css styles/main.css -->
<link rel="stylesheet" href="styles/main.css">
<!-- endbuild -->
<!-- build:js scripts/vendor.js -->
<script src="/bower_components/a/a.js"></script>
<script src="/bower_components/b/b.js"></script>
<!-- endbuild -->
</head>
<body>@@include('partials/foot.html')</body>
</html>
"#;

#[test]
fn html_packages_pages_and_their_bundles() {
    init_tracing();
    let project = TestProject::new()
        .configure(no_tools)
        .configure(|cfg| cfg.html.collapse_whitespace = false)
        .file("app/index.html", PAGE)
        .file("app/partials/foot.html", "<footer>f</footer>")
        .file(".tmp/styles/main.css", "body{color:red}")
        .file("bower_components/a/a.js", "var a;")
        .file("bower_components/b/b.js", "var b;");

    html::run(&project.ctx(BuildMode::Production)).unwrap();

    let page = project.read("dist/index.html");
    assert!(page.contains(r#"<link rel="stylesheet" href="styles/main.css">"#), "{page}");
    assert!(page.contains(r#"<script src="scripts/vendor.js"></script>"#), "{page}");
    assert!(page.contains("<footer>f</footer>"), "{page}");
    assert!(!page.contains("build:"), "{page}");

    assert_eq!(project.read("dist/scripts/vendor.js"), "var a;\nvar b;");
    assert_eq!(project.read("dist/styles/main.css"), "body{color:red}");
}

#[test]
fn html_collapses_whitespace_when_enabled() {
    init_tracing();
    let project = TestProject::new()
        .configure(no_tools)
        .file("app/index.html", "<div>\n    <p>hi</p>\n</div>\n");

    html::run(&project.ctx(BuildMode::Production)).unwrap();

    let page = project.read("dist/index.html");
    assert!(!page.contains("\n    "), "{page}");
    assert!(page.contains("<p>hi</p>"));
}

#[test]
fn html_fails_on_a_missing_bundle_reference() {
    init_tracing();
    let project = TestProject::new()
        .configure(no_tools)
        .file(
            "app/index.html",
            "<!-- build:js scripts/app.js -->\n<script src=\"scripts/gone.js\"></script>\n<!-- endbuild -->\n",
        )
        .file("app/about.html", "<p>about</p>");

    let err = html::run(&project.ctx(BuildMode::Production)).unwrap_err();

    assert!(matches!(err, TaskError::Transform { failed: 1, total: 2 }), "{err:?}");
    assert!(project.exists("dist/about.html"));
    assert!(!project.exists("dist/index.html"));
}
