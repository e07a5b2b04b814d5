// src/process/supervisor.rs

//! The one supervised application process.
//!
//! `Supervisor` owns at most one child. Its pid is kept in memory and in
//! `<output>/static/internal/app.pid` so the next session can kill an
//! instance left behind by a crash.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{DevloopError, Result};
use crate::layout::Layout;
use crate::logging::APP_TARGET;

use super::backend::{AppProcess, ProcessFuture};
use super::readiness::{health_url, wait_until_ready};
use super::toolchain::{install_artifact, render_build_cmd, run_build};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Everything the supervisor needs, resolved from the config once.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub root: PathBuf,
    pub executable: PathBuf,
    pub pid_path: PathBuf,
    pub port: u16,
    pub build_cmd: String,
    pub artifact: PathBuf,
    pub health_url: String,
    pub readiness_attempts: u32,
    pub readiness_interval: Duration,
    pub stop_grace: Duration,
}

impl SupervisorConfig {
    pub fn from_config(cfg: &ConfigFile, layout: &Layout) -> Self {
        Self {
            root: layout.root.clone(),
            executable: layout.executable.clone(),
            pid_path: layout.pid_path(),
            port: cfg.app.port,
            build_cmd: render_build_cmd(&cfg.app.build_cmd, &cfg.app.entry),
            artifact: layout.root.join(cfg.artifact()),
            health_url: health_url(cfg.app.port, cfg.health_check_path()),
            readiness_attempts: cfg.app.readiness_attempts,
            readiness_interval: Duration::from_millis(cfg.app.readiness_interval_ms),
            stop_grace: Duration::from_millis(cfg.app.stop_grace_ms),
        }
    }
}

/// A running child and its pid.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

#[derive(Debug)]
struct Inner {
    state: ProcessState,
    handle: Option<ProcessHandle>,
}

#[derive(Debug)]
pub struct Supervisor {
    cfg: SupervisorConfig,
    inner: Mutex<Inner>,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(Inner {
                state: ProcessState::Stopped,
                handle: None,
            }),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    pub async fn state(&self) -> ProcessState {
        self.inner.lock().await.state
    }

    /// Pid of the running child, if any.
    pub async fn pid(&self) -> Option<u32> {
        self.inner.lock().await.handle.as_ref().map(ProcessHandle::pid)
    }

    /// Kill whatever pid a previous session left in the PID file.
    ///
    /// Returns whether a live process was found and killed.
    pub async fn kill_orphan(&self) -> Result<bool> {
        let contents = match tokio::fs::read_to_string(&self.cfg.pid_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let killed = match contents.trim().parse::<u32>() {
            Ok(pid) => {
                info!(pid, "killing app process left by a previous session");
                terminate_pid(pid, self.cfg.stop_grace).await?
            }
            Err(_) => {
                warn!(path = ?self.cfg.pid_path, "ignoring malformed PID file");
                false
            }
        };

        remove_pid_file(&self.cfg.pid_path).await?;
        Ok(killed)
    }

    pub async fn start_app(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.handle.is_some() {
            warn!("start requested while the app is running; stopping it first");
            self.stop_locked(&mut inner).await?;
        }

        inner.state = ProcessState::Starting;
        let spawned = self.spawn_child().await;
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                inner.state = ProcessState::Stopped;
                return Err(err);
            }
        };

        if let Err(err) = write_pid_file(&self.cfg.pid_path, handle.pid).await {
            warn!(error = %err, "failed to persist PID file");
        }

        info!(pid = handle.pid, port = self.cfg.port, "app started");
        inner.handle = Some(handle);
        inner.state = ProcessState::Running;
        Ok(())
    }

    pub async fn stop_app(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.stop_locked(&mut inner).await
    }

    async fn spawn_child(&self) -> Result<ProcessHandle> {
        let exe = &self.cfg.executable;
        let mut cmd = Command::new(exe);
        cmd.current_dir(&self.cfg.root)
            .env("PORT", self.cfg.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning app executable {:?}", exe))?;
        let pid = child
            .id()
            .ok_or_else(|| DevloopError::Process("app exited before its pid was read".into()))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(target: APP_TARGET, pid, "{}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: APP_TARGET, pid, "{}", line);
                }
            });
        }

        Ok(ProcessHandle { child, pid })
    }

    async fn stop_locked(&self, inner: &mut Inner) -> Result<()> {
        let Some(mut handle) = inner.handle.take() else {
            debug!("stop requested but no app is running");
            inner.state = ProcessState::Stopped;
            return Ok(());
        };

        inner.state = ProcessState::Stopping;
        let pid = handle.pid;
        debug!(pid, "stopping app");

        let result = async {
            if send_terminate(pid).await? {
                match tokio::time::timeout(self.cfg.stop_grace, handle.child.wait()).await {
                    Ok(status) => {
                        let status = status.context("waiting for app to exit")?;
                        debug!(pid, ?status, "app exited");
                    }
                    Err(_) => {
                        warn!(pid, grace_ms = self.cfg.stop_grace.as_millis() as u64, "app ignored termination; killing");
                        force_kill_child(&mut handle.child).await?;
                    }
                }
            } else {
                debug!(pid, "app already gone");
                let _ = handle.child.try_wait();
            }
            remove_pid_file(&self.cfg.pid_path).await
        }
        .await;

        inner.state = ProcessState::Stopped;
        if result.is_ok() {
            info!(pid, "app stopped");
        }
        result
    }
}

impl AppProcess for Supervisor {
    fn recompile(&self) -> ProcessFuture<'_> {
        Box::pin(async move {
            run_build(&self.cfg.build_cmd, &self.cfg.root).await?;
            install_artifact(&self.cfg.artifact, &self.cfg.executable).await
        })
    }

    fn start(&self) -> ProcessFuture<'_> {
        Box::pin(self.start_app())
    }

    fn stop(&self) -> ProcessFuture<'_> {
        Box::pin(self.stop_app())
    }

    fn wait_for_readiness(&self) -> ProcessFuture<'_> {
        Box::pin(wait_until_ready(
            &self.cfg.health_url,
            self.cfg.readiness_attempts,
            self.cfg.readiness_interval,
        ))
    }
}

async fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, pid.to_string()).await?;
    Ok(())
}

async fn remove_pid_file(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn force_kill_child(child: &mut Child) -> Result<()> {
    match child.kill().await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(DevloopError::Process(format!("force kill failed: {e}"))),
    }
}

/// Ask `pid` to exit. `Ok(false)` when no such process exists.
#[cfg(unix)]
async fn send_terminate(pid: u32) -> Result<bool> {
    send_signal(pid, libc::SIGTERM)
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> Result<bool> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| DevloopError::Process(format!("pid {pid} out of range")))?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, signal) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(false)
    } else {
        Err(DevloopError::Process(format!("signalling pid {pid}: {err}")))
    }
}

#[cfg(windows)]
async fn send_terminate(pid: u32) -> Result<bool> {
    taskkill(pid, false).await
}

#[cfg(windows)]
async fn taskkill(pid: u32, force: bool) -> Result<bool> {
    let mut cmd = Command::new("taskkill");
    cmd.arg("/PID").arg(pid.to_string()).arg("/T");
    if force {
        cmd.arg("/F");
    }
    let status = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .context("running taskkill")?;
    Ok(status.success())
}

/// Terminate a pid we hold no `Child` for: signal, wait up to `grace`,
/// then force-kill.
#[cfg(unix)]
async fn terminate_pid(pid: u32, grace: Duration) -> Result<bool> {
    if !send_signal(pid, libc::SIGTERM)? {
        return Ok(false);
    }
    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if !send_signal(pid, 0)? {
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    send_signal(pid, libc::SIGKILL)?;
    Ok(true)
}

#[cfg(windows)]
async fn terminate_pid(pid: u32, _grace: Duration) -> Result<bool> {
    taskkill(pid, true).await
}
