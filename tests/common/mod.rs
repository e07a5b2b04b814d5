#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devloop::config::ConfigFile;
use devloop::engine::DevContext;
use devloop::fs::mock::MockFileSystem;
use devloop::livereload::Broadcaster;
use devloop::watch::WatchRule;
use devloop_test_utils::builders::ConfigFileBuilder;
use devloop_test_utils::fake_process::FakeProcess;

pub use devloop_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Config rooted at the temp dir, for use with `MockFileSystem`.
pub fn mock_config() -> ConfigFile {
    ConfigFileBuilder::new().build()
}

/// Absolute path of `rel` under the config root.
pub fn at(cfg: &ConfigFile, rel: &str) -> PathBuf {
    cfg.root().join(rel)
}

pub struct MockSession {
    pub ctx: DevContext,
    pub fs: MockFileSystem,
    pub process: FakeProcess,
    pub broadcaster: Broadcaster,
}

/// A context over an in-memory filesystem and a fake app.
pub fn mock_session(cfg: ConfigFile, rules: Option<Vec<WatchRule>>) -> MockSession {
    let fs = MockFileSystem::new();
    let process = FakeProcess::new();
    let (broadcaster, _) = Broadcaster::spawn();
    let ctx = match rules {
        Some(rules) => DevContext::with_rules(
            cfg,
            Arc::new(fs.clone()),
            Arc::new(process.clone()),
            broadcaster.clone(),
            rules,
        ),
        None => DevContext::new(
            cfg,
            Arc::new(fs.clone()),
            Arc::new(process.clone()),
            broadcaster.clone(),
        ),
    };
    MockSession {
        ctx,
        fs,
        process,
        broadcaster,
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
