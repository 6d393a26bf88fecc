// src/paths.rs

//! Path registry: where each class of asset comes from and where it goes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::model::AssetPathsOverride;

/// Logical asset classes of the scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Scripts,
    Styles,
    Html,
    Images,
    Videos,
    Fonts,
    Locales,
    Misc,
}

impl AssetClass {
    pub const ALL: [AssetClass; 8] = [
        AssetClass::Scripts,
        AssetClass::Styles,
        AssetClass::Html,
        AssetClass::Images,
        AssetClass::Videos,
        AssetClass::Fonts,
        AssetClass::Locales,
        AssetClass::Misc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Scripts => "scripts",
            AssetClass::Styles => "styles",
            AssetClass::Html => "html",
            AssetClass::Images => "images",
            AssetClass::Videos => "videos",
            AssetClass::Fonts => "fonts",
            AssetClass::Locales => "locales",
            AssetClass::Misc => "misc",
        }
    }

    /// Built-in `(input, tmp, output)` triple for this class.
    fn defaults(self) -> (&'static str, &'static str, &'static str) {
        match self {
            AssetClass::Scripts => ("app/scripts/**/*.js", ".tmp/scripts", "dist/scripts"),
            AssetClass::Styles => ("app/styles/**/*.scss", ".tmp/styles", "dist/styles"),
            AssetClass::Html => ("app/**/*.html", ".tmp", "dist"),
            AssetClass::Images => (
                "app/images/**/*.{jpeg,jpg,png,svg,gif,ico}",
                ".tmp/images",
                "dist/images",
            ),
            AssetClass::Videos => ("app/videos/**/*.{mp4,mov}", ".tmp/videos", "dist/videos"),
            AssetClass::Fonts => (
                "app/fonts/**/*.{ttf,woff,woff2,eot,svg}",
                ".tmp/fonts",
                "dist/fonts",
            ),
            AssetClass::Locales => ("app/locales/**/*.ftl", ".tmp/locales", "dist/locales"),
            AssetClass::Misc => ("app/*.{ico,png,txt,xml,json}", ".tmp", "dist"),
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input glob plus intermediate and final directories for one asset class.
///
/// All three are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub input: String,
    pub tmp: PathBuf,
    pub output: PathBuf,
}

/// Immutable lookup table from [`AssetClass`] to [`AssetPaths`].
#[derive(Debug, Clone)]
pub struct PathRegistry {
    entries: BTreeMap<AssetClass, AssetPaths>,
}

impl Default for PathRegistry {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl PathRegistry {
    /// Build the registry from the defaults, replacing whichever fields the
    /// configuration sets.
    pub fn with_overrides(overrides: &BTreeMap<AssetClass, AssetPathsOverride>) -> Self {
        let entries = AssetClass::ALL
            .iter()
            .map(|&class| {
                let (input, tmp, output) = class.defaults();
                let over = overrides.get(&class);
                let paths = AssetPaths {
                    input: over
                        .and_then(|o| o.input.clone())
                        .unwrap_or_else(|| input.to_string()),
                    tmp: over
                        .and_then(|o| o.tmp.clone())
                        .unwrap_or_else(|| PathBuf::from(tmp)),
                    output: over
                        .and_then(|o| o.output.clone())
                        .unwrap_or_else(|| PathBuf::from(output)),
                };
                (class, paths)
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, class: AssetClass) -> &AssetPaths {
        // Every class is inserted in `with_overrides`.
        &self.entries[&class]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, &AssetPaths)> {
        self.entries.iter().map(|(class, paths)| (*class, paths))
    }
}

/// Literal directory prefix of a glob: every component before the first one
/// containing a wildcard. A glob without wildcards is a file path; its base
/// is the parent directory.
///
/// Single-character classes such as `[[]` (what `globset::escape` produces)
/// are literal and appear unescaped in the base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<String> = components.iter().map_while(|c| literal_component(c)).collect();
    let keep = if literal.len() == components.len() {
        literal.len().saturating_sub(1)
    } else {
        literal.len()
    };

    literal[..keep].iter().collect()
}

fn literal_component(component: &str) -> Option<String> {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' | '?' | '{' => return None,
            '[' => match (chars.next(), chars.next()) {
                (Some(lit), Some(']')) if lit != '!' && lit != '^' => out.push(lit),
                _ => return None,
            },
            _ => out.push(c),
        }
    }
    Some(out)
}

/// Path of `to` as seen from directory `from`; both relative to the same
/// root. Uses `..` to climb out of `from`.
pub fn relative_to(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("app/styles/**/*.scss"), PathBuf::from("app/styles"));
        assert_eq!(glob_base("app/*.{ico,png}"), PathBuf::from("app"));
        assert_eq!(glob_base("app/**/*.html"), PathBuf::from("app"));
        assert_eq!(glob_base("**/*.js"), PathBuf::new());
    }

    #[test]
    fn glob_base_of_literal_file_is_parent() {
        assert_eq!(glob_base("bower.json"), PathBuf::new());
        assert_eq!(
            glob_base("bower_components/font/fonts/a.woff"),
            PathBuf::from("bower_components/font/fonts")
        );
    }

    #[test]
    fn escaped_brackets_stay_in_the_base() {
        let pattern = globset::escape("bower_components/ui [v2]/fonts/a[1].woff");
        assert_eq!(
            glob_base(&pattern),
            PathBuf::from("bower_components/ui [v2]/fonts")
        );
        assert_eq!(glob_base("app/[ab]/*.css"), PathBuf::from("app"));
    }

    #[test]
    fn default_layout_maps_every_class() {
        let expected = [
            (AssetClass::Scripts, "app/scripts/**/*.js", ".tmp/scripts", "dist/scripts"),
            (AssetClass::Styles, "app/styles/**/*.scss", ".tmp/styles", "dist/styles"),
            (AssetClass::Html, "app/**/*.html", ".tmp", "dist"),
            (
                AssetClass::Images,
                "app/images/**/*.{jpeg,jpg,png,svg,gif,ico}",
                ".tmp/images",
                "dist/images",
            ),
            (AssetClass::Videos, "app/videos/**/*.{mp4,mov}", ".tmp/videos", "dist/videos"),
            (
                AssetClass::Fonts,
                "app/fonts/**/*.{ttf,woff,woff2,eot,svg}",
                ".tmp/fonts",
                "dist/fonts",
            ),
            (AssetClass::Locales, "app/locales/**/*.ftl", ".tmp/locales", "dist/locales"),
            (AssetClass::Misc, "app/*.{ico,png,txt,xml,json}", ".tmp", "dist"),
        ];

        let registry = PathRegistry::default();
        assert_eq!(registry.iter().count(), expected.len());
        for (class, input, tmp, output) in expected {
            assert_eq!(
                registry.get(class),
                &AssetPaths {
                    input: input.to_string(),
                    tmp: PathBuf::from(tmp),
                    output: PathBuf::from(output),
                },
                "class {class}"
            );
        }
    }

    #[test]
    fn relative_to_climbs_out_of_the_source_dir() {
        assert_eq!(
            relative_to(Path::new("app/styles"), Path::new("bower_components/a/_a.scss")),
            PathBuf::from("../../bower_components/a/_a.scss")
        );
        assert_eq!(
            relative_to(Path::new("app"), Path::new("app/scripts/main.js")),
            PathBuf::from("scripts/main.js")
        );
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            AssetClass::Styles,
            AssetPathsOverride {
                input: Some("src/css/**/*.scss".into()),
                tmp: None,
                output: None,
            },
        );
        let registry = PathRegistry::with_overrides(&overrides);
        let styles = registry.get(AssetClass::Styles);
        assert_eq!(styles.input, "src/css/**/*.scss");
        assert_eq!(styles.tmp, PathBuf::from(".tmp/styles"));
        assert_eq!(styles.output, PathBuf::from("dist/styles"));
    }
}
