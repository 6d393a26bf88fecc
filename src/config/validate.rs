// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every semantic check on an already deserialized config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_server(cfg)?;
    validate_paths(cfg)?;
    validate_wiredep(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(PipelineError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(PipelineError::ConfigError(
            "[server].port must be a fixed, non-zero port".to_string(),
        ));
    }
    if cfg.server.reload_port == cfg.server.port {
        return Err(PipelineError::ConfigError(format!(
            "[server].reload_port must differ from [server].port ({})",
            cfg.server.port
        )));
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    for (class, over) in cfg.paths.iter() {
        if let Some(input) = &over.input {
            if input.trim().is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "[paths.{class}].input must not be empty"
                )));
            }
            Glob::new(input).map_err(|e| {
                PipelineError::ConfigError(format!("[paths.{class}].input is not a valid glob: {e}"))
            })?;
        }
    }
    Ok(())
}

fn validate_wiredep(cfg: &RawConfigFile) -> Result<()> {
    for (key, pattern) in [
        ("styles_ignore_path", &cfg.wiredep.styles_ignore_path),
        ("html_ignore_path", &cfg.wiredep.html_ignore_path),
    ] {
        Regex::new(pattern).map_err(|e| {
            PipelineError::ConfigError(format!("[wiredep].{key} is not a valid regex: {e}"))
        })?;
    }
    Ok(())
}
