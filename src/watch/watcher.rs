// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::engine::RuntimeEvent;
use crate::matcher::PatternMatcher;

use super::debouncer::Debouncer;
use super::event::{FileEvent, FileOps};
use super::path_utils::{dir_is_ignored, relative_str};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching and, with it, the collector task.
pub struct WatcherHandle {
    _inner: Arc<Mutex<RecommendedWatcher>>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Where to watch and what to leave out.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    pub ignore: Vec<String>,
    pub debounce: Duration,
}

/// Start watching `opts.root` and forward debounced batches to the runtime
/// as [`RuntimeEvent::Batch`].
///
/// Directories are registered one by one, non-recursively, skipping ignored
/// ones; directories created later are registered as their events arrive.
/// Collection keeps running while the receiver is busy with earlier batches.
pub fn spawn_watcher(
    opts: WatchOptions,
    matcher: Arc<PatternMatcher>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = opts.root.canonicalize().unwrap_or_else(|_| opts.root.clone());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("devloop: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("devloop: file watch error: {err}"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;
    let watcher = Arc::new(Mutex::new(watcher));

    let registered = register_tree(&watcher, &root, &root, &matcher, &opts.ignore)?;
    info!(root = ?root, dirs = registered, "file watcher started");

    let handle = WatcherHandle {
        _inner: Arc::clone(&watcher),
    };
    let weak = Arc::downgrade(&watcher);

    tokio::spawn(async move {
        let mut debouncer = Debouncer::new(opts.debounce);

        loop {
            let next = match debouncer.deadline() {
                Some(deadline) => {
                    let sleep = tokio::time::sleep_until(deadline.into());
                    tokio::select! {
                        ev = event_rx.recv() => ev,
                        _ = sleep => {
                            if let Some(batch) = debouncer.take_if_ready(Instant::now()) {
                                debug!(paths = batch.len(), "batch ready");
                                if runtime_tx.send(RuntimeEvent::Batch(batch)).await.is_err() {
                                    break;
                                }
                            }
                            continue;
                        }
                    }
                }
                None => event_rx.recv().await,
            };

            let Some(event) = next else { break };
            trace!(?event, "received notify event");

            let Some(ops) = FileOps::from_kind(&event.kind) else {
                continue;
            };
            let now = Instant::now();

            for path in &event.paths {
                let Some(rel) = relative_str(&root, path) else {
                    continue;
                };
                if rel.is_empty() {
                    continue;
                }

                let meta = std::fs::metadata(path).ok();
                if meta.as_ref().is_some_and(|m| m.is_dir()) {
                    if ops.contains(FileOps::CREATE) || ops.contains(FileOps::RENAME) {
                        if let Some(watcher) = weak.upgrade() {
                            match register_tree(&watcher, &root, path, &matcher, &opts.ignore) {
                                Ok(n) if n > 0 => debug!(dir = %rel, dirs = n, "watching new directory"),
                                Ok(_) => {}
                                Err(e) => warn!(dir = %rel, error = %e, "failed to watch new directory"),
                            }
                        }
                    }
                    continue;
                }

                let mut ev = FileEvent::new(rel, ops, now);
                if let Some(meta) = meta {
                    ev = ev.with_len(meta.len());
                }
                debouncer.add(ev);
            }
        }

        debug!("watcher collector finished");
    });

    Ok(handle)
}

/// Register `dir` and every non-ignored directory below it. Returns how
/// many directories were added.
fn register_tree(
    watcher: &Mutex<RecommendedWatcher>,
    root: &Path,
    dir: &Path,
    matcher: &PatternMatcher,
    ignore: &[String],
) -> Result<usize> {
    let mut count = 0;
    let mut stack = vec![dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let rel = relative_str(root, &dir).unwrap_or_default();
        if dir_is_ignored(matcher, &rel, ignore) {
            trace!(dir = %rel, "not watching ignored directory");
            continue;
        }

        {
            let mut w = match watcher.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            w.watch(&dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watching {:?}", dir))?;
        }
        count += 1;

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = ?dir, error = %e, "cannot list directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                stack.push(entry.path());
            }
        }
    }

    Ok(count)
}
