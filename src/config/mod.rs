// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load `Pipeline.toml` from disk, falling back to defaults (`loader.rs`).
//! - Validate values such as ports, globs and regexes (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    AssetPathsOverride, BuildSection, ConfigFile, ConfigSection, HtmlSection, ImagesSection,
    LintSection, ProjectSection, RawConfigFile, ScriptsSection, ServerSection, StylesSection,
    WiredepSection,
};
pub use validate::validate_config;
