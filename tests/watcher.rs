// tests/watcher.rs

mod common;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use devloop::engine::RuntimeEvent;
use devloop::matcher::PatternMatcher;
use devloop::watch::path_utils::{dir_is_ignored, relative_str};
use devloop::watch::{ignore_patterns, spawn_watcher, WatchOptions};
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration, Instant};

use common::{init_tracing, TestResult};

#[test]
fn relative_paths_use_forward_slashes() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("static/public"))?;

    assert_eq!(
        relative_str(root, &root.join("static/public/a.png")).as_deref(),
        Some("static/public/a.png")
    );
    assert_eq!(relative_str(root, root).as_deref(), Some(""));
    assert_eq!(relative_str(root, Path::new("/elsewhere/x")), None);
    Ok(())
}

#[test]
fn ignored_directories_cover_their_contents() {
    let matcher = PatternMatcher::new();
    let ignore = ignore_patterns("dist", &["**/*.tmp".to_string()]);

    assert!(dir_is_ignored(&matcher, "dist", &ignore));
    assert!(dir_is_ignored(&matcher, "dist/static", &ignore));
    assert!(dir_is_ignored(&matcher, "node_modules", &ignore));
    assert!(!dir_is_ignored(&matcher, "static/public", &ignore));
    assert!(!dir_is_ignored(&matcher, "", &ignore));
}

#[tokio::test]
async fn new_directories_are_watched_and_output_is_not() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    fs::create_dir_all(root.join("static/public"))?;
    fs::create_dir_all(root.join("dist/static"))?;

    let (tx, mut rx) = mpsc::channel(16);
    let opts = WatchOptions {
        root: root.clone(),
        ignore: ignore_patterns("dist", &[]),
        debounce: Duration::from_millis(100),
    };
    let _handle = spawn_watcher(opts, Arc::new(PatternMatcher::new()), tx)?;
    sleep(Duration::from_millis(200)).await;

    fs::create_dir_all(root.join("static/public/img"))?;
    // Let the collector register the new directory.
    sleep(Duration::from_millis(300)).await;
    fs::write(root.join("static/public/img/a.png"), b"png")?;
    fs::write(root.join("dist/static/out.txt"), b"built")?;

    let mut seen = BTreeSet::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !seen.contains("static/public/img/a.png") && Instant::now() < deadline {
        match timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Some(RuntimeEvent::Batch(batch))) => {
                seen.extend(batch.paths().map(str::to_string));
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {}
        }
    }

    assert!(seen.contains("static/public/img/a.png"), "seen: {seen:?}");
    assert!(seen.iter().all(|p| !p.starts_with("dist/")), "seen: {seen:?}");
    Ok(())
}
