//! Hands a finished artifact to the platform's default viewer.

use std::{
    path::Path,
    process::{Command, Stdio},
};

use tracing::info;

use crate::errors::AppError;

/// Spawns the viewer and returns without waiting for it.
pub fn open_artifact(path: &Path) -> Result<(), AppError> {
    let mut command = viewer_command(path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AppError::io(path, e))?;
    info!(artifact = %path.display(), "opened artifact in viewer");
    Ok(())
}

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}
