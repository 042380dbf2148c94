//! Running external commands through the OS shell.
//!
//! Every toolchain invocation goes through here so that the selected toolchain's
//! environment prelude is prepended uniformly. Captured output is routed through a
//! uniquely named temp file which is removed before the call returns.

use crate::error::{BuildError, Result};
use std::{
    fs,
    process::{Command, ExitStatus},
};

/// Builds the platform shell invocation for `cmd`.
fn shell(cmd: &str) -> Command {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(cmd);
        } else {
            let mut command = Command::new("sh");
            command.arg("-c").arg(cmd);
        }
    }
    command
}

/// Joins the env-setup prelude and the command into one shell line.
pub fn with_prelude(prelude: &str, cmd: &str) -> String {
    if prelude.is_empty() {
        cmd.to_string()
    } else {
        format!("{prelude} && {cmd}")
    }
}

/// Runs `cmd` via the OS shell and returns its exit status code.
pub fn system(cmd: &str) -> Result<i32> {
    trace!(%cmd, "system");
    let status = shell(cmd).status().map_err(|err| BuildError::msg(format!("error running `{cmd}`: {err}")))?;
    Ok(status.code().unwrap_or(-1))
}

/// Runs `cmd` with the given prelude, inheriting stdio. Non-zero exit fails.
pub fn run(prelude: &str, cmd: &str) -> Result<()> {
    let line = with_prelude(prelude, cmd);
    trace!(cmd = %line, "run");
    let status =
        shell(&line).status().map_err(|err| BuildError::msg(format!("error running `{cmd}`: {err}")))?;
    if !status.success() {
        return Err(BuildError::tool(cmd, status, String::new()));
    }
    Ok(())
}

/// Runs `cmd` with the given prelude, capturing stdout and stderr.
///
/// Returns the exit status and the captured output with trailing whitespace
/// stripped, without judging the status. The capture file is deleted before
/// returning; failure to delete is ignored.
pub fn run_status_capture(prelude: &str, cmd: &str) -> Result<(ExitStatus, String)> {
    let capture = tempfile::Builder::new()
        .prefix("fbuild-run")
        .suffix(".out")
        .tempfile()
        .map_err(|err| BuildError::msg(format!("error creating capture file: {err}")))?
        .into_temp_path();

    let line = format!("{} 1>\"{}\" 2>&1", with_prelude(prelude, cmd), capture.display());
    trace!(cmd = %line, "run (captured)");
    let status =
        shell(&line).status().map_err(|err| BuildError::msg(format!("error running `{cmd}`: {err}")))?;

    let output = fs::read_to_string(&capture).unwrap_or_default();
    let output = output.trim_end().to_string();
    // `capture` is a TempPath; dropping it removes the file, errors ignored
    Ok((status, output))
}

/// Runs `cmd` with the given prelude and returns the captured output.
/// Non-zero exit fails with the output folded into the error.
pub fn run_capture(prelude: &str, cmd: &str) -> Result<String> {
    let (status, output) = run_status_capture(prelude, cmd)?;
    if !status.success() {
        return Err(BuildError::tool(cmd, status, output));
    }
    Ok(output)
}
