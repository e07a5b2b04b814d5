// src/watch/rules.rs

use std::path::Path;

use crate::callbacks::Callback;
use crate::config::RuleConfig;
use crate::matcher::normalize;

/// A `[[watch.rule]]` ready for matching.
#[derive(Debug, Clone, Default)]
pub struct WatchRule {
    /// Normalized once at construction.
    pub pattern: String,
    pub run_callbacks_only: bool,
    pub skip_rebuilding_notice: bool,
    pub recompile_executable: bool,
    pub restart_process: bool,
    pub treat_source_as_opaque: bool,
    pub callbacks: Vec<Callback>,
}

impl WatchRule {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: normalize(pattern),
            ..Self::default()
        }
    }

    /// Build from config; shell callbacks run in `root`.
    pub fn from_config(cfg: &RuleConfig, root: &Path) -> Self {
        Self {
            pattern: normalize(&cfg.pattern),
            run_callbacks_only: cfg.run_callbacks_only,
            skip_rebuilding_notice: cfg.skip_rebuilding_notice,
            recompile_executable: cfg.recompile_executable,
            restart_process: cfg.restart_process,
            treat_source_as_opaque: cfg.treat_source_as_opaque,
            callbacks: cfg
                .callback
                .iter()
                .map(|cb| Callback::from_config(cb, root))
                .collect(),
        }
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }
}

/// Rules from config, in declaration order.
pub fn rules_from_config(rules: &[RuleConfig], root: &Path) -> Vec<WatchRule> {
    rules.iter().map(|r| WatchRule::from_config(r, root)).collect()
}
