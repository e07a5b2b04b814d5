// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::Strategy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// root = "."
/// output_dir = "dist"
///
/// [app]
/// artifact = "target/debug/site"
/// health_check_path = "/healthz"
///
/// [[watch.rule]]
/// pattern = "templates/**/*.html"
/// restart_process = true
/// ```
///
/// All sections are optional and have reasonable defaults, apart from
/// `app.artifact` and `app.health_check_path`, which validation requires.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub assets: AssetsSection,

    #[serde(default)]
    pub app: AppSection,

    #[serde(default)]
    pub livereload: LiveReloadSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// A validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// code holding a `ConfigFile` can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub assets: AssetsSection,
    pub app: AppSection,
    pub livereload: LiveReloadSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            assets: raw.assets,
            app: raw.app,
            livereload: raw.livereload,
            watch: raw.watch,
        }
    }

    /// Project root every other path is relative to.
    pub fn root(&self) -> &Path {
        &self.project.root
    }

    /// Absolute (root-joined) output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.output_dir)
    }

    /// Health-check path; presence is guaranteed by validation.
    pub fn health_check_path(&self) -> &str {
        self.app.health_check_path.as_deref().unwrap_or("/")
    }

    /// Path of the built artifact the toolchain produces, relative to root.
    pub fn artifact(&self) -> &str {
        self.app.artifact.as_deref().unwrap_or_default()
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Project root. Relative values are resolved against the directory of
    /// the config file by the loader.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Output tree, relative to `root`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            output_dir: default_output_dir(),
        }
    }
}

/// `[assets]` section. All directories are relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsSection {
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    #[serde(default = "default_private_dir")]
    pub private_dir: String,

    /// Sub-tree (inside either static dir) whose files keep their literal
    /// name instead of getting a content hash.
    #[serde(default = "default_no_hash_prefix")]
    pub no_hash_prefix: String,

    /// URL prefix under which the host app serves the public output dir.
    #[serde(default = "default_public_url_prefix")]
    pub public_url_prefix: String,

    #[serde(default = "default_critical_css_dir")]
    pub critical_css_dir: String,

    #[serde(default = "default_normal_css_dir")]
    pub normal_css_dir: String,
}

fn default_public_dir() -> String {
    "static/public".to_string()
}

fn default_private_dir() -> String {
    "static/private".to_string()
}

fn default_no_hash_prefix() -> String {
    "__nohash".to_string()
}

fn default_public_url_prefix() -> String {
    "/public/".to_string()
}

fn default_critical_css_dir() -> String {
    "styles/critical".to_string()
}

fn default_normal_css_dir() -> String {
    "styles/normal".to_string()
}

impl Default for AssetsSection {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
            private_dir: default_private_dir(),
            no_hash_prefix: default_no_hash_prefix(),
            public_url_prefix: default_public_url_prefix(),
            critical_css_dir: default_critical_css_dir(),
            normal_css_dir: default_normal_css_dir(),
        }
    }
}

/// `[app]` section: how to build, run and health-check the application.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    /// File name of the supervised executable inside `<output>/bin/`.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Entry point handed to the toolchain through the `{entry}` placeholder.
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Shell command that builds the executable.
    #[serde(default = "default_build_cmd")]
    pub build_cmd: String,

    /// Where `build_cmd` leaves the executable, relative to root.
    #[serde(default)]
    pub artifact: Option<String>,

    /// Port the app listens on; exported to it as `PORT`.
    #[serde(default = "default_app_port")]
    pub port: u16,

    /// Required. Path polled with `GET` until it answers 200.
    #[serde(default)]
    pub health_check_path: Option<String>,

    #[serde(default = "default_readiness_attempts")]
    pub readiness_attempts: u32,

    #[serde(default = "default_readiness_interval_ms")]
    pub readiness_interval_ms: u64,

    /// How long `stop()` waits after the termination signal before
    /// force-killing.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// File extensions that count as application source code.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_entry() -> String {
    ".".to_string()
}

fn default_build_cmd() -> String {
    "cargo build --manifest-path {entry}/Cargo.toml".to_string()
}

fn default_app_port() -> u16 {
    8080
}

fn default_readiness_attempts() -> u32 {
    100
}

fn default_readiness_interval_ms() -> u64 {
    50
}

fn default_stop_grace_ms() -> u64 {
    3000
}

fn default_source_extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            entry: default_entry(),
            build_cmd: default_build_cmd(),
            artifact: None,
            port: default_app_port(),
            health_check_path: None,
            readiness_attempts: default_readiness_attempts(),
            readiness_interval_ms: default_readiness_interval_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            source_extensions: default_source_extensions(),
        }
    }
}

/// `[livereload]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveReloadSection {
    #[serde(default = "default_livereload_port")]
    pub port: u16,
}

fn default_livereload_port() -> u16 {
    35729
}

impl Default for LiveReloadSection {
    fn default() -> Self {
        Self {
            port: default_livereload_port(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Fixed collection window, measured from the first event of a batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Extra ignore globs on top of the built-in ones.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// `[[watch.rule]]` entries, matched in declaration order.
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
}

fn default_debounce_ms() -> u64 {
    30
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: Vec::new(),
            rule: Vec::new(),
        }
    }
}

/// `[[watch.rule]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub pattern: String,

    /// Only run callbacks; skip the default rebuild for matching paths.
    #[serde(default)]
    pub run_callbacks_only: bool,

    /// Don't send the `rebuilding` notice to browsers for this rule.
    #[serde(default)]
    pub skip_rebuilding_notice: bool,

    #[serde(default)]
    pub recompile_executable: bool,

    #[serde(default)]
    pub restart_process: bool,

    /// A source file matched by this rule does not force a recompile.
    #[serde(default)]
    pub treat_source_as_opaque: bool,

    #[serde(default)]
    pub callback: Vec<CallbackConfig>,
}

/// `[[watch.rule.callback]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackConfig {
    /// Shell command; the changed path is exported as `DEVLOOP_CHANGED_PATH`.
    pub cmd: String,

    /// Defaults to `pre` when omitted.
    #[serde(default)]
    pub strategy: Option<Strategy>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl CallbackConfig {
    pub fn effective_strategy(&self) -> Strategy {
        self.strategy.unwrap_or_default()
    }
}
