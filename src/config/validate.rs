// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevloopError, Result};
use crate::matcher::validate_pattern;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DevloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_project(cfg)?;
    validate_app(cfg)?;
    validate_ports(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> DevloopError {
    DevloopError::ConfigError(msg.into())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.project.root.is_dir() {
        return Err(config_error(format!(
            "[project].root {:?} is not a directory",
            cfg.project.root
        )));
    }
    if cfg.project.output_dir.as_os_str().is_empty() {
        return Err(config_error("[project].output_dir must not be empty"));
    }
    if cfg.assets.no_hash_prefix.trim_matches('/').is_empty() {
        return Err(config_error("[assets].no_hash_prefix must not be empty"));
    }
    Ok(())
}

fn validate_app(cfg: &RawConfigFile) -> Result<()> {
    match cfg.app.health_check_path.as_deref() {
        None => {
            return Err(config_error(
                "[app].health_check_path is required (e.g. \"/healthz\")",
            ));
        }
        Some(p) if !p.starts_with('/') => {
            return Err(config_error(format!(
                "[app].health_check_path must start with '/' (got {p:?})"
            )));
        }
        Some(_) => {}
    }

    match cfg.app.artifact.as_deref() {
        None | Some("") => {
            return Err(config_error(
                "[app].artifact is required (path of the executable the build produces)",
            ));
        }
        Some(_) => {}
    }

    if cfg.app.build_cmd.trim().is_empty() {
        return Err(config_error("[app].build_cmd must not be empty"));
    }
    if cfg.app.name.trim().is_empty() || cfg.app.name.contains(['/', '\\']) {
        return Err(config_error(format!(
            "[app].name must be a plain file name (got {:?})",
            cfg.app.name
        )));
    }
    if cfg.app.readiness_attempts == 0 {
        return Err(config_error("[app].readiness_attempts must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_ports(cfg: &RawConfigFile) -> Result<()> {
    if cfg.app.port == 0 {
        return Err(config_error("[app].port must be non-zero"));
    }
    if cfg.livereload.port == 0 {
        return Err(config_error("[livereload].port must be non-zero"));
    }
    if cfg.app.port == cfg.livereload.port {
        return Err(config_error(format!(
            "[app].port and [livereload].port must differ (both {})",
            cfg.app.port
        )));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(config_error("[watch].debounce_ms must be >= 1 (got 0)"));
    }

    for pattern in cfg.watch.ignore.iter() {
        validate_pattern(pattern)
            .map_err(|e| config_error(format!("[watch].ignore: {e}")))?;
    }

    for (idx, rule) in cfg.watch.rule.iter().enumerate() {
        if rule.pattern.trim().is_empty() {
            return Err(config_error(format!(
                "[[watch.rule]] #{idx} has an empty pattern"
            )));
        }
        validate_pattern(&rule.pattern)
            .map_err(|e| config_error(format!("[[watch.rule]] #{idx}: {e}")))?;

        for cb in rule.callback.iter() {
            if cb.cmd.trim().is_empty() {
                return Err(config_error(format!(
                    "[[watch.rule]] '{}' has a callback with an empty cmd",
                    rule.pattern
                )));
            }
            for pattern in cb.exclude.iter() {
                validate_pattern(pattern).map_err(|e| {
                    config_error(format!(
                        "[[watch.rule]] '{}' callback exclude: {e}",
                        rule.pattern
                    ))
                })?;
            }
        }
    }
    Ok(())
}
