// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::paths::AssetClass;
use crate::types::TriggerWhileRunningBehaviour;

/// Top-level configuration as read from `Pipeline.toml`.
///
/// Every section is optional; the defaults reproduce the stock scaffold:
///
/// ```toml
/// [server]
/// port = 9000
///
/// [paths.styles]
/// input = "app/styles/**/*.scss"
///
/// [lint]
/// ruleset = "airbnb"
/// ```
///
/// Use [`ConfigFile::try_from`] (or the loader) to obtain a validated value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub paths: BTreeMap<AssetClass, AssetPathsOverride>,
    #[serde(default)]
    pub config: ConfigSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub scripts: ScriptsSection,
    #[serde(default)]
    pub lint: LintSection,
    #[serde(default)]
    pub html: HtmlSection,
    #[serde(default)]
    pub images: ImagesSection,
    #[serde(default)]
    pub wiredep: WiredepSection,
    #[serde(default)]
    pub build: BuildSection,
}

/// Validated configuration.
///
/// Only constructible through validation (`TryFrom<RawConfigFile>`), or via
/// `Default`, which is valid by construction.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub paths: BTreeMap<AssetClass, AssetPathsOverride>,
    pub config: ConfigSection,
    pub server: ServerSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
    pub lint: LintSection,
    pub html: HtmlSection,
    pub images: ImagesSection,
    pub wiredep: WiredepSection,
    pub build: BuildSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            paths: raw.paths,
            config: raw.config,
            server: raw.server,
            styles: raw.styles,
            scripts: raw.scripts,
            lint: raw.lint,
            html: raw.html,
            images: raw.images,
            wiredep: raw.wiredep,
            build: raw.build,
        }
    }
}

/// `[project]`: top-level directory layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Source tree.
    pub app_dir: PathBuf,
    /// Intermediate (development) tree, removed by `clean`.
    pub tmp_dir: PathBuf,
    /// Final output tree, removed by `clean`.
    pub dist_dir: PathBuf,
    /// Test harness served by `serve:test`.
    pub test_dir: PathBuf,
    /// Dependency manifest.
    pub manifest: PathBuf,
    /// Where the third-party components are installed.
    pub components_dir: PathBuf,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            app_dir: PathBuf::from("app"),
            tmp_dir: PathBuf::from(".tmp"),
            dist_dir: PathBuf::from("dist"),
            test_dir: PathBuf::from("test"),
            manifest: PathBuf::from("bower.json"),
            components_dir: PathBuf::from("bower_components"),
        }
    }
}

/// `[paths.<class>]`: any subset of the triple may be overridden.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetPathsOverride {
    pub input: Option<String>,
    pub tmp: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// `[config]` section.
///
/// Controls behaviour when watch triggers arrive while a run is active.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[server]`: the development server front.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Preferred port of the reload WebSocket; any free port is used when it
    /// is taken.
    pub reload_port: u16,
    /// Show a short notice in the page when the reload socket connects.
    pub notify: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            reload_port: 1337,
            notify: false,
        }
    }
}

/// `[styles]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StylesSection {
    /// Extra Sass load paths, relative to the project root.
    pub include_paths: Vec<PathBuf>,
    /// Browser-support range handed to the prefixer.
    pub browsers: Vec<String>,
    /// Vendor prefixer command (stdin CSS, stdout CSS). `None` skips the
    /// prefixing stage.
    pub prefixer: Option<String>,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            include_paths: vec![PathBuf::from(".")],
            browsers: vec!["> 0.3%".to_string(), "last 4 versions".to_string()],
            prefixer: Some(
                "npx --no-install postcss --use autoprefixer --autoprefixer.cascade false"
                    .to_string(),
            ),
        }
    }
}

/// `[scripts]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptsSection {
    /// Transpiler command (stdin modern JS, stdout compatible JS).
    pub transpiler: String,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            transpiler: "npx --no-install babel --filename {file} --source-maps inline".to_string(),
        }
    }
}

/// `[lint]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LintSection {
    /// Linter command; must print ESLint-style JSON results on stdout.
    pub command: String,
    /// Name of the rule set, available to the command as `{ruleset}`.
    pub ruleset: String,
    /// Where `lint:test` writes its copies.
    pub test_spec_dir: PathBuf,
}

impl Default for LintSection {
    fn default() -> Self {
        Self {
            command: "npx --no-install eslint --fix-dry-run --format json --stdin --stdin-filename {file}"
                .to_string(),
            ruleset: "airbnb".to_string(),
            test_spec_dir: PathBuf::from("test/spec"),
        }
    }
}

/// `[html]`: production packaging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HtmlSection {
    /// Directories searched, in order, for files referenced by build blocks.
    pub search_path: Vec<PathBuf>,
    pub js_minifier: Option<String>,
    pub css_minifier: Option<String>,
    pub collapse_whitespace: bool,
}

impl Default for HtmlSection {
    fn default() -> Self {
        Self {
            search_path: vec![PathBuf::from(".tmp"), PathBuf::from("app"), PathBuf::from(".")],
            js_minifier: Some("npx --no-install terser --compress --mangle".to_string()),
            css_minifier: Some("npx --no-install postcss --no-map --use cssnano".to_string()),
            collapse_whitespace: true,
        }
    }
}

/// `[images]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    pub cache_dir: PathBuf,
    /// External optimizer command. When unset, PNGs are re-encoded in
    /// process and other formats pass through.
    pub optimizer: Option<String>,
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache/images"),
            optimizer: None,
        }
    }
}

/// `[wiredep]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WiredepSection {
    /// Components whose files contain any of these strings are not injected.
    pub exclude: Vec<String>,
    /// Regex stripped from injected paths in style sources.
    pub styles_ignore_path: String,
    /// Regex stripped from injected paths in HTML sources.
    pub html_ignore_path: String,
}

impl Default for WiredepSection {
    fn default() -> Self {
        Self {
            exclude: vec!["bootstrap-sass".to_string()],
            styles_ignore_path: r"^(\.\./)+".to_string(),
            html_ignore_path: r"^(\.\./)*\.\.".to_string(),
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Also report the gzip size of the output tree.
    pub gzip: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self { gzip: true }
    }
}
