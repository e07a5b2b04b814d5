// tests/engine_dispatch.rs

mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use devloop::assets::hashed_name;
use devloop::callbacks::Callback;
use devloop::engine::{
    dispatch_batch, plan_batch, BatchOutcome, DefaultAction, HotMessage, Runtime, RuntimeEvent,
};
use devloop::errors::DevloopError;
use devloop::livereload::{LiveClient, ReloadMessage};
use devloop::process::AppProcess;
use devloop::types::{ChangeType, Strategy};
use devloop::watch::{EventBatch, FileEvent, FileOps, WatchRule};
use devloop_test_utils::recording_hook::{new_log, RecordingHook};

use common::{at, init_tracing, mock_config, mock_session, with_timeout, MockSession, TestResult};

type Inbox = Arc<Mutex<Vec<ReloadMessage>>>;

fn batch(paths: &[&str]) -> EventBatch {
    let now = Instant::now();
    paths
        .iter()
        .map(|p| FileEvent::new(*p, FileOps::WRITE, now))
        .collect()
}

/// Drain a client's queue in the background so depth-1 queues never fill.
fn collect(mut client: LiveClient) -> Inbox {
    let inbox: Inbox = Arc::default();
    let sink = inbox.clone();
    tokio::spawn(async move {
        while let Some(msg) = client.rx.recv().await {
            sink.lock().unwrap().push(msg);
        }
    });
    inbox
}

async fn wait_for(inbox: &Inbox, n: usize) -> Vec<ChangeType> {
    with_timeout(async {
        loop {
            {
                let msgs = inbox.lock().unwrap();
                if msgs.len() >= n {
                    return msgs.iter().map(|m| m.change_type).collect();
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

/// Give the coordinator a moment and return whatever arrived.
async fn settle(inbox: &Inbox) -> Vec<ChangeType> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    inbox.lock().unwrap().iter().map(|m| m.change_type).collect()
}

async fn running_session(rules: Option<Vec<WatchRule>>) -> MockSession {
    let s = mock_session(mock_config(), rules);
    s.process.start().await.unwrap();
    s.process.clear_calls();
    s
}

#[tokio::test]
async fn source_change_restarts_app_and_reloads() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    s.process.set_stop_delay(Duration::from_millis(20));
    let inbox = collect(s.broadcaster.register().await?);

    let outcome = dispatch_batch(&s.ctx, &batch(&["src/main.rs"])).await?;

    assert_eq!(outcome, BatchOutcome::Restarted);
    assert_eq!(s.process.calls(), vec!["recompile", "stop", "start", "ready"]);
    assert_eq!(
        wait_for(&inbox, 2).await,
        vec![ChangeType::Rebuilding, ChangeType::Other]
    );
    Ok(())
}

#[tokio::test]
async fn several_paths_share_one_recompile_and_stop_early() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    s.process.set_stop_delay(Duration::from_millis(20));

    let outcome = dispatch_batch(&s.ctx, &batch(&["src/a.rs", "src/b.rs", "src/c.rs"])).await?;

    assert_eq!(outcome, BatchOutcome::Restarted);
    assert_eq!(s.process.recompiles(), 1);
    let calls = s.process.calls();
    assert_eq!(calls.iter().filter(|c| **c == "stop").count(), 1);
    assert_eq!(&calls[calls.len() - 2..], &["start", "ready"]);
    assert!(s.process.is_running());
    Ok(())
}

#[tokio::test]
async fn failed_compile_leaves_app_alone() {
    init_tracing();
    let s = running_session(None).await;
    s.process.set_fail_recompile(true);
    let inbox = collect(s.broadcaster.register().await.unwrap());

    let err = dispatch_batch(&s.ctx, &batch(&["src/main.rs"])).await.unwrap_err();

    assert!(matches!(err, DevloopError::Build(ref m) if m.contains("fake compile error")));
    assert_eq!(s.process.calls(), vec!["recompile"]);
    assert!(s.process.is_running());
    assert_eq!(settle(&inbox).await, vec![ChangeType::Rebuilding]);
}

#[tokio::test]
async fn failed_compile_after_early_stop_restarts_previous_build() {
    init_tracing();
    let s = running_session(None).await;
    s.process.set_fail_recompile(true);

    let result = dispatch_batch(&s.ctx, &batch(&["src/a.rs", "src/b.rs"])).await;

    assert!(result.is_err());
    let calls = s.process.calls();
    assert!(calls.contains(&"stop"));
    assert_eq!(calls.last(), Some(&"start"));
    assert!(s.process.is_running());
}

#[tokio::test]
async fn public_asset_change_reloads_without_restart() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    let cfg = &s.ctx.config;
    s.fs.add_file(at(cfg, "static/public/logo.png"), b"png".to_vec());
    let inbox = collect(s.broadcaster.register().await?);

    let outcome = dispatch_batch(&s.ctx, &batch(&["static/public/logo.png"])).await?;

    assert_eq!(outcome, BatchOutcome::HotReloaded);
    assert_eq!(s.process.calls(), vec!["ready"]);
    assert_eq!(wait_for(&inbox, 1).await, vec![ChangeType::Other]);
    assert!(s.ctx.pipeline.public_url("logo.png").is_some());
    Ok(())
}

#[tokio::test]
async fn critical_css_change_inlines_new_stylesheet() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    let cfg = &s.ctx.config;
    s.fs.add_file(at(cfg, "styles/critical/a.css"), b"body {\n  color: red;\n}".to_vec());
    let inbox = collect(s.broadcaster.register().await?);

    let outcome = dispatch_batch(&s.ctx, &batch(&["styles/critical/a.css"])).await?;

    assert_eq!(outcome, BatchOutcome::HotReloaded);
    assert_eq!(wait_for(&inbox, 1).await, vec![ChangeType::CriticalStyle]);
    let msg = inbox.lock().unwrap()[0].clone();
    assert_eq!(msg.critical_css_bytes(), Some(b"body { color: red; }".to_vec()));
    assert!(msg.normal_css_url.is_empty());
    Ok(())
}

#[tokio::test]
async fn normal_css_change_sends_bundle_url() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    let cfg = &s.ctx.config;
    s.fs.add_file(at(cfg, "styles/normal/b.css"), b"p{}".to_vec());
    let inbox = collect(s.broadcaster.register().await?);

    dispatch_batch(&s.ctx, &batch(&["styles/normal/b.css"])).await?;

    assert_eq!(wait_for(&inbox, 1).await, vec![ChangeType::NormalStyle]);
    let url = inbox.lock().unwrap()[0].normal_css_url.clone();
    let expected = hashed_name("normal", Some("css"), b"p{}");
    assert_eq!(url, format!("/public/{expected}"));
    assert!(inbox.lock().unwrap()[0].critical_css.is_empty());
    Ok(())
}

#[tokio::test]
async fn irrelevant_batch_has_no_side_effects() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    let inbox = collect(s.broadcaster.register().await?);

    let outcome = dispatch_batch(&s.ctx, &batch(&["README.md", "node_modules/x/index.js"])).await?;

    assert_eq!(outcome, BatchOutcome::Ignored);
    assert!(s.process.calls().is_empty());
    assert!(settle(&inbox).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn readiness_failure_suppresses_reload() {
    init_tracing();
    let s = running_session(None).await;
    s.process.set_never_ready(true);
    let cfg = &s.ctx.config;
    s.fs.add_file(at(cfg, "static/public/logo.png"), b"png".to_vec());
    let inbox = collect(s.broadcaster.register().await.unwrap());

    let err = dispatch_batch(&s.ctx, &batch(&["static/public/logo.png"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DevloopError::Readiness { .. }));
    assert!(settle(&inbox).await.is_empty());
}

#[tokio::test]
async fn rule_can_opt_out_of_rebuilding_notice() -> TestResult {
    init_tracing();
    let rule = WatchRule {
        restart_process: true,
        skip_rebuilding_notice: true,
        ..WatchRule::new("templates/**/*.html")
    };
    let s = running_session(Some(vec![rule])).await;
    let inbox = collect(s.broadcaster.register().await?);

    let outcome = dispatch_batch(&s.ctx, &batch(&["templates/index.html"])).await?;

    assert_eq!(outcome, BatchOutcome::Restarted);
    // Restart without recompiling.
    assert_eq!(s.process.calls(), vec!["stop", "start", "ready"]);
    assert_eq!(wait_for(&inbox, 1).await, vec![ChangeType::Other]);
    assert_eq!(settle(&inbox).await, vec![ChangeType::Other]);
    Ok(())
}

#[tokio::test]
async fn callbacks_only_rule_skips_default_work() -> TestResult {
    init_tracing();
    let log = new_log();
    let rule = WatchRule {
        run_callbacks_only: true,
        ..WatchRule::new("content/**")
    }
    .with_callback(Callback::new(
        Arc::new(RecordingHook::new("sync", log.clone())),
        Strategy::Pre,
    ));
    let s = running_session(Some(vec![rule])).await;

    let outcome = dispatch_batch(&s.ctx, &batch(&["content/post.md"])).await?;

    assert_eq!(outcome, BatchOutcome::HotReloaded);
    assert_eq!(*log.lock().unwrap(), vec!["sync:start", "sync:end"]);
    assert_eq!(s.process.recompiles(), 0);
    // `revalidate` is gated on readiness.
    assert_eq!(s.process.calls(), vec!["ready"]);
    Ok(())
}

#[tokio::test]
async fn runtime_dispatches_batches_until_shutdown_then_stops_app() -> TestResult {
    init_tracing();
    let s = running_session(None).await;
    let process = s.process.clone();
    let (tx, rx) = tokio::sync::mpsc::channel(4);

    tx.send(RuntimeEvent::Batch(batch(&["src/main.rs"]))).await?;
    tx.send(RuntimeEvent::ShutdownRequested).await?;
    // Never reached.
    tx.send(RuntimeEvent::Batch(batch(&["src/lib.rs"]))).await?;

    with_timeout(Runtime::new(Arc::new(s.ctx), rx).run()).await?;

    assert_eq!(process.recompiles(), 1);
    assert_eq!(process.calls().last(), Some(&"stop"));
    assert!(!process.is_running());
    Ok(())
}

#[tokio::test]
async fn plan_for_mixed_hot_batch() {
    let s = mock_session(mock_config(), None);
    let classified = s.ctx.classifier.classify(&batch(&[
        "styles/critical/a.css",
        "styles/critical/b.css",
        "styles/normal/c.css",
    ]));

    let plan = plan_batch(&s.ctx.classifier, &classified);

    assert!(!plan.hard_reload);
    assert!(!plan.kill_early);
    assert!(!plan.send_rebuilding);
    assert_eq!(plan.messages, vec![HotMessage::Critical, HotMessage::Normal]);
    assert!(
        plan.steps
            .iter()
            .all(|step| step.actions == vec![DefaultAction::BuildStylesheets])
    );
}

#[tokio::test]
async fn plan_for_static_and_source_batch() {
    let s = mock_session(mock_config(), None);
    let classified = s
        .ctx
        .classifier
        .classify(&batch(&["src/main.rs", "static/private/mail.html"]));

    let plan = plan_batch(&s.ctx.classifier, &classified);

    assert!(plan.hard_reload);
    assert!(plan.kill_early);
    assert!(plan.send_rebuilding);
    assert!(plan.messages.is_empty());
    let actions: Vec<_> = plan.steps.iter().map(|s| s.actions.clone()).collect();
    assert_eq!(
        actions,
        vec![vec![DefaultAction::Recompile], vec![DefaultAction::BuildAssets]]
    );
}

#[tokio::test]
async fn callbacks_only_rule_on_source_does_not_restart() -> TestResult {
    init_tracing();
    let log = new_log();
    let rule = WatchRule {
        run_callbacks_only: true,
        restart_process: true,
        ..WatchRule::new("src/**/*.rs")
    }
    .with_callback(Callback::new(
        Arc::new(RecordingHook::new("gen", log.clone())),
        Strategy::Pre,
    ));
    let s = running_session(Some(vec![rule])).await;
    let inbox = collect(s.broadcaster.register().await?);

    let outcome = dispatch_batch(&s.ctx, &batch(&["src/main.rs"])).await?;

    assert_eq!(outcome, BatchOutcome::HotReloaded);
    assert_eq!(*log.lock().unwrap(), vec!["gen:start", "gen:end"]);
    assert_eq!(s.process.recompiles(), 0);
    assert_eq!(s.process.calls(), vec!["ready"]);
    assert!(s.process.is_running());
    assert_eq!(settle(&inbox).await, vec![ChangeType::Revalidate]);
    Ok(())
}
