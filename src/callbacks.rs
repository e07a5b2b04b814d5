// src/callbacks.rs

//! Rule callbacks and the order they run in around the default action.

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::CallbackConfig;
use crate::errors::{DevloopError, Result};
use crate::matcher::PatternMatcher;
use crate::process::toolchain::shell_command;
use crate::types::Strategy;

/// Environment variable through which shell callbacks see the changed path.
pub const CHANGED_PATH_ENV: &str = "DEVLOOP_CHANGED_PATH";

pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Something to run for a changed path.
pub trait ChangeHook: Send + Sync + Debug {
    /// `path` is relative to the project root, slash-separated.
    fn run<'a>(&'a self, path: &'a str) -> HookFuture<'a>;
}

/// Runs a shell command in the project root.
#[derive(Debug, Clone)]
pub struct ShellHook {
    cmd: String,
    cwd: PathBuf,
}

impl ShellHook {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl ChangeHook for ShellHook {
    fn run<'a>(&'a self, path: &'a str) -> HookFuture<'a> {
        Box::pin(async move {
            debug!(cmd = %self.cmd, path = %path, "running callback");
            let output = shell_command(&self.cmd)
                .current_dir(&self.cwd)
                .env(CHANGED_PATH_ENV, path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
                .await
                .with_context(|| format!("spawning callback `{}`", self.cmd))?;

            if output.status.success() {
                return Ok(());
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut message = format!(
                "`{}` exited with {}",
                self.cmd,
                output.status.code().unwrap_or(-1)
            );
            if !stderr.trim().is_empty() {
                message.push_str(": ");
                message.push_str(stderr.trim_end());
            }
            Err(DevloopError::Callback {
                path: path.to_string(),
                message,
            })
        })
    }
}

/// A hook plus when to run it and which paths to skip.
#[derive(Debug, Clone)]
pub struct Callback {
    pub hook: Arc<dyn ChangeHook>,
    pub strategy: Strategy,
    pub exclude: Vec<String>,
}

impl Callback {
    pub fn new(hook: Arc<dyn ChangeHook>, strategy: Strategy) -> Self {
        Self {
            hook,
            strategy,
            exclude: Vec::new(),
        }
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns
            .iter()
            .map(|p| crate::matcher::normalize(p))
            .collect();
        self
    }

    /// Shell callback from a `[[watch.rule.callback]]` entry.
    pub fn from_config(cfg: &CallbackConfig, root: impl Into<PathBuf>) -> Self {
        Callback::new(
            Arc::new(ShellHook::new(cfg.cmd.clone(), root)),
            cfg.effective_strategy(),
        )
        .with_exclude(cfg.exclude.clone())
    }
}

/// Run a hook in the background. Its outcome is only logged.
pub fn spawn_detached(hook: Arc<dyn ChangeHook>, path: String) {
    tokio::spawn(async move {
        match hook.run(&path).await {
            Ok(()) => debug!(path = %path, "detached callback finished"),
            Err(err) => warn!(path = %path, error = %err, "detached callback failed"),
        }
    });
}

/// Run `callbacks` for one path around `default_action`:
///
/// 1. `concurrent-no-wait` hooks are spawned detached.
/// 2. `pre` hooks run one after another; the first failure aborts the path.
/// 3. The default action and all `concurrent` hooks run together. Every one
///    of them finishes; the first error (default action first) is returned.
/// 4. `post` hooks run one after another.
///
/// With `run_callbacks_only` the default action is not run at all. Hooks
/// whose exclude patterns match `path` are skipped.
pub async fn run_for_path<F, Fut>(
    callbacks: &[Callback],
    run_callbacks_only: bool,
    path: &str,
    matcher: &PatternMatcher,
    default_action: F,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let applicable: Vec<&Callback> = callbacks
        .iter()
        .filter(|cb| !matcher.is_ignored(path, &cb.exclude))
        .collect();

    for cb in with_strategy(&applicable, Strategy::ConcurrentNoWait) {
        spawn_detached(Arc::clone(&cb.hook), path.to_string());
    }

    for cb in with_strategy(&applicable, Strategy::Pre) {
        cb.hook.run(path).await?;
    }

    let concurrent = futures::future::join_all(
        with_strategy(&applicable, Strategy::Concurrent).map(|cb| cb.hook.run(path)),
    );
    let default = async move {
        if run_callbacks_only {
            debug!(path = %path, "callbacks only; skipping default action");
            Ok(())
        } else {
            default_action().await
        }
    };
    let (default_res, concurrent_res) = futures::join!(default, concurrent);

    default_res?;
    if let Some(err) = concurrent_res.into_iter().find_map(|r| r.err()) {
        return Err(err);
    }

    for cb in with_strategy(&applicable, Strategy::Post) {
        cb.hook.run(path).await?;
    }

    if !applicable.is_empty() {
        info!(path = %path, callbacks = applicable.len(), "callbacks finished");
    }
    Ok(())
}

fn with_strategy<'a>(
    callbacks: &'a [&'a Callback],
    strategy: Strategy,
) -> impl Iterator<Item = &'a Callback> + 'a {
    callbacks
        .iter()
        .copied()
        .filter(move |cb| cb.strategy == strategy)
}
