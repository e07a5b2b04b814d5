// src/process/toolchain.rs

//! Toolchain invocation for `recompile`.

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{DevloopError, Result};

/// Build a platform shell command.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Substitute the `{entry}` placeholder of a build command.
pub fn render_build_cmd(template: &str, entry: &str) -> String {
    template.replace("{entry}", entry)
}

/// Run the build command in `root`, capturing its output.
///
/// A non-zero exit becomes [`DevloopError::Build`] carrying whatever the tool
/// printed.
pub async fn run_build(cmd: &str, root: &Path) -> Result<()> {
    info!(cmd = %cmd, "compiling application");

    let output = shell_command(cmd)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("spawning build command `{cmd}`"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let mut msg = format!("`{cmd}` exited with {code}");
        for part in [stdout.trim_end(), stderr.trim_end()] {
            if !part.is_empty() {
                msg.push('\n');
                msg.push_str(part);
            }
        }
        return Err(DevloopError::Build(msg));
    }

    debug!(stdout = %stdout.trim_end(), stderr = %stderr.trim_end(), "build output");
    Ok(())
}

/// Copy the built artifact to the supervised location.
///
/// Goes through a temporary file and a rename so a still-running old
/// executable is never overwritten in place.
pub async fn install_artifact(artifact: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating dir {:?}", parent))?;
    }
    let tmp = dest.with_extension("new");
    tokio::fs::copy(artifact, &tmp)
        .await
        .with_context(|| format!("copying artifact {:?} to {:?}", artifact, tmp))?;
    tokio::fs::rename(&tmp, dest)
        .await
        .with_context(|| format!("moving {:?} into place at {:?}", tmp, dest))?;
    debug!(?artifact, ?dest, "installed executable");
    Ok(())
}
