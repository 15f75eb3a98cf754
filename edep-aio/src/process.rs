// edep-aio/src/process.rs
use std::process::{Output, Stdio};
use std::sync::Arc;

use edep_common::error::{EdepError, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

/// Runs an external command, optionally feeding `stdin_data` to it, and
/// captures its output. A non-zero exit status is returned in the `Output`,
/// not as an error.
pub async fn run_command_async(
    program: &str,
    args: &[String],
    stdin_data: Option<&str>,
) -> Result<Output> {
    // Arguments may carry registry user names; never log stdin.
    debug!("Running command: {} {:?}", program, args);

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.kill_on_drop(true);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn().map_err(|e| {
        error!("Failed to execute {}: {}", program, e);
        EdepError::Io(Arc::new(e))
    })?;

    if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
        stdin.write_all(data.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        debug!("{} failed with status: {}", program, output.status);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("Stderr:\n{}", stderr.trim());
        }
    } else {
        debug!("{} finished successfully.", program);
    }
    Ok(output)
}

/// Trimmed stderr of a failed command, for error messages.
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
