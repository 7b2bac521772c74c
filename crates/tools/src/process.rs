//! Subprocess helper shared by the tools that run external programs.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use localmind_core::error::ToolError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    /// stdout then stderr, as one block.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, _) => self.stderr.trim_end().to_string(),
        }
    }
}

/// Run `program args..` in `cwd`, optionally feeding `stdin`, bounded by `timeout`.
///
/// The child is killed if the timeout fires.
pub(crate) async fn run(
    tool_name: &str,
    program: &str,
    args: &[&str],
    cwd: &Path,
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<CommandOutput, ToolError> {
    debug!(tool = tool_name, program, ?args, cwd = %cwd.display(), "Spawning command");

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = command.spawn().map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        reason: format!("failed to start '{program}': {e}"),
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: tool_name.into(),
                reason: format!("failed to write stdin: {e}"),
            })?;
        // Dropping the pipe closes it so the child sees EOF
    }

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ToolError::Timeout {
            tool_name: tool_name.into(),
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: e.to_string(),
        })?;

    Ok(CommandOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: started.elapsed(),
    })
}

/// The last `max_lines` lines of `text`.
pub(crate) fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
