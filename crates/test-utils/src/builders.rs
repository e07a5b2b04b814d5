#![allow(dead_code)]

use std::path::{Path, PathBuf};

use devloop::config::{CallbackConfig, ConfigFile, RawConfigFile, RuleConfig};
use devloop::types::Strategy;

/// Builder for `ConfigFile` to simplify test setup.
///
/// The root defaults to the system temp dir, which exists everywhere and is
/// fine for tests that use `MockFileSystem`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.project.root = std::env::temp_dir();
        config.app.artifact = Some("target/debug/app".to_string());
        config.app.health_check_path = Some("/healthz".to_string());
        Self { config }
    }

    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.project.root = root.as_ref().to_path_buf();
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.config.project.output_dir = PathBuf::from(dir);
        self
    }

    pub fn app_port(mut self, port: u16) -> Self {
        self.config.app.port = port;
        self
    }

    pub fn livereload_port(mut self, port: u16) -> Self {
        self.config.livereload.port = port;
        self
    }

    pub fn build_cmd(mut self, cmd: &str) -> Self {
        self.config.app.build_cmd = cmd.to_string();
        self
    }

    pub fn artifact(mut self, artifact: &str) -> Self {
        self.config.app.artifact = Some(artifact.to_string());
        self
    }

    pub fn readiness(mut self, attempts: u32, interval_ms: u64) -> Self {
        self.config.app.readiness_attempts = attempts;
        self.config.app.readiness_interval_ms = interval_ms;
        self
    }

    pub fn stop_grace_ms(mut self, ms: u64) -> Self {
        self.config.app.stop_grace_ms = ms;
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.config.watch.ignore.push(pattern.to_string());
        self
    }

    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.config.watch.rule.push(rule);
        self
    }

    /// The raw config, for tests that exercise validation failures.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `[[watch.rule]]` entries.
pub struct RuleBuilder {
    rule: RuleConfig,
}

impl RuleBuilder {
    pub fn new(pattern: &str) -> Self {
        Self {
            rule: RuleConfig {
                pattern: pattern.to_string(),
                ..RuleConfig::default()
            },
        }
    }

    pub fn run_callbacks_only(mut self) -> Self {
        self.rule.run_callbacks_only = true;
        self
    }

    pub fn skip_rebuilding_notice(mut self) -> Self {
        self.rule.skip_rebuilding_notice = true;
        self
    }

    pub fn recompile_executable(mut self) -> Self {
        self.rule.recompile_executable = true;
        self
    }

    pub fn restart_process(mut self) -> Self {
        self.rule.restart_process = true;
        self
    }

    pub fn treat_source_as_opaque(mut self) -> Self {
        self.rule.treat_source_as_opaque = true;
        self
    }

    pub fn callback(mut self, cmd: &str, strategy: Strategy) -> Self {
        self.rule.callback.push(CallbackConfig {
            cmd: cmd.to_string(),
            strategy: Some(strategy),
            exclude: Vec::new(),
        });
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}
