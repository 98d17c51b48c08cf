//! External password helper subprocess.
//!
//! The repository password can come from an external command (a password
//! manager, a prompt script) instead of being stored on disk. The command
//! runs under `sh -c` with `BRIG_PATH` set to the state directory, prints
//! the password on stdout, and must finish within [`HELPER_TIMEOUT`].
//! There is no retry and no fallback: a failed helper is a hard error.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// How long the helper may run before it is killed.
pub const HELPER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum HelperError {
    #[error("failed to spawn password helper: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("password helper exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("password helper did not finish within {0:?}")]
    Timeout(Duration),

    #[error("password helper produced non-UTF-8 output")]
    NotUtf8,
}

/// Run the configured helper command and return the password it prints.
///
/// Trailing newlines and carriage returns are stripped from stdout, so
/// `echo secret` and `printf secret` behave the same.
pub async fn read_password_from_helper(
    command: &str,
    state_dir: &Path,
) -> Result<String, HelperError> {
    read_password_with_timeout(command, state_dir, HELPER_TIMEOUT).await
}

/// Like [`read_password_from_helper`] with an injectable timeout.
pub async fn read_password_with_timeout(
    command: &str,
    state_dir: &Path,
    timeout: Duration,
) -> Result<String, HelperError> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .env("BRIG_PATH", state_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // If the future is dropped at the timeout, take the child with it.
        .kill_on_drop(true);
    if let Ok(home) = std::env::var("HOME") {
        cmd.env("HOME", home);
    }

    tracing::debug!(command, state_dir = %state_dir.display(), "running password helper");

    let child = cmd.spawn().map_err(HelperError::Spawn)?;
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(HelperError::Spawn)?,
        Err(_) => {
            tracing::warn!(command, ?timeout, "password helper timed out");
            return Err(HelperError::Timeout(timeout));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        return Err(HelperError::Failed {
            status: output.status,
            stderr,
        });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| HelperError::NotUtf8)?;
    Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
}
