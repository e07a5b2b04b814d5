// tests/supervisor.rs

#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devloop::errors::DevloopError;
use devloop::process::toolchain::{install_artifact, render_build_cmd, run_build};
use devloop::process::{AppProcess, ProcessState, Supervisor, SupervisorConfig};

use common::{init_tracing, with_timeout, TestResult};

fn write_script(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn supervisor_for(root: &Path, executable: PathBuf) -> Supervisor {
    Supervisor::new(SupervisorConfig {
        root: root.to_path_buf(),
        executable,
        pid_path: root.join("dist/static/internal/app.pid"),
        port: 0,
        build_cmd: "true".into(),
        artifact: root.join("artifact"),
        health_url: "http://127.0.0.1:9/healthz".into(),
        readiness_attempts: 1,
        readiness_interval: Duration::from_millis(10),
        stop_grace: Duration::from_millis(500),
    })
}

fn pid_alive(pid: u32) -> bool {
    // SAFETY: signal 0 only checks for existence.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[tokio::test]
async fn start_writes_pid_file_and_stop_removes_it() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let exe = write_script(dir.path(), "app", "exec sleep 30")?;
    let sup = supervisor_for(dir.path(), exe);

    with_timeout(sup.start_app()).await?;
    assert_eq!(sup.state().await, ProcessState::Running);
    let pid = sup.pid().await.expect("running app has a pid");
    let recorded = std::fs::read_to_string(&sup.config().pid_path)?;
    assert_eq!(recorded.trim(), pid.to_string());

    with_timeout(sup.stop_app()).await?;
    assert_eq!(sup.state().await, ProcessState::Stopped);
    assert!(!sup.config().pid_path.exists());
    assert!(!pid_alive(pid));

    // Nothing left to stop.
    with_timeout(sup.stop_app()).await?;
    Ok(())
}

#[tokio::test]
async fn stubborn_app_is_killed_after_grace() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let exe = write_script(dir.path(), "app", "trap '' TERM\nwhile true; do sleep 1; done")?;
    let sup = supervisor_for(dir.path(), exe);

    sup.start_app().await?;
    // Let the shell install its trap.
    tokio::time::sleep(Duration::from_millis(100)).await;
    with_timeout(sup.stop_app()).await?;

    assert_eq!(sup.state().await, ProcessState::Stopped);
    assert!(sup.pid().await.is_none());
    Ok(())
}

#[tokio::test]
async fn starting_twice_replaces_the_running_app() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let exe = write_script(dir.path(), "app", "exec sleep 30")?;
    let sup = supervisor_for(dir.path(), exe);

    sup.start_app().await?;
    let first = sup.pid().await.expect("pid");
    sup.start_app().await?;
    let second = sup.pid().await.expect("pid");

    assert_ne!(first, second);
    assert!(!pid_alive(first));
    sup.stop_app().await?;
    Ok(())
}

#[tokio::test]
async fn missing_executable_fails_to_start() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor_for(dir.path(), dir.path().join("nope"));

    assert!(sup.start_app().await.is_err());
    assert_eq!(sup.state().await, ProcessState::Stopped);
}

#[tokio::test]
async fn orphan_from_previous_session_is_killed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor_for(dir.path(), dir.path().join("app"));

    let mut orphan = std::process::Command::new("sleep").arg("30").spawn()?;
    let pid_path = &sup.config().pid_path;
    std::fs::create_dir_all(pid_path.parent().unwrap())?;
    std::fs::write(pid_path, orphan.id().to_string())?;

    assert!(with_timeout(sup.kill_orphan()).await?);
    assert!(!orphan.wait()?.success());
    assert!(!pid_path.exists());

    // No PID file: nothing to do.
    assert!(!sup.kill_orphan().await?);
    Ok(())
}

#[tokio::test]
async fn malformed_pid_file_is_discarded() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor_for(dir.path(), dir.path().join("app"));
    let pid_path = &sup.config().pid_path;
    std::fs::create_dir_all(pid_path.parent().unwrap())?;
    std::fs::write(pid_path, "not a pid")?;

    assert!(!sup.kill_orphan().await?);
    assert!(!pid_path.exists());
    Ok(())
}

#[tokio::test]
async fn build_failure_carries_tool_output() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let err = run_build("echo 'error[E0308]: mismatched types' >&2; exit 101", dir.path())
        .await
        .unwrap_err();

    match err {
        DevloopError::Build(msg) => {
            assert!(msg.contains("exited with 101"), "{msg}");
            assert!(msg.contains("mismatched types"), "{msg}");
        }
        other => panic!("expected build error, got {other:?}"),
    }
}

#[tokio::test]
async fn recompile_installs_the_artifact() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut cfg = supervisor_for(dir.path(), dir.path().join("dist/app")).config().clone();
    cfg.build_cmd = render_build_cmd("printf built > {entry}", "artifact");
    let sup = Supervisor::new(cfg);

    sup.recompile().await?;
    assert_eq!(std::fs::read_to_string(dir.path().join("dist/app"))?, "built");

    // Reinstalling over an existing executable replaces it.
    std::fs::write(dir.path().join("artifact"), "rebuilt")?;
    install_artifact(&dir.path().join("artifact"), &dir.path().join("dist/app")).await?;
    assert_eq!(std::fs::read_to_string(dir.path().join("dist/app"))?, "rebuilt");
    Ok(())
}
