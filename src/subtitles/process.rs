// Subprocess helpers shared by the yt-dlp source

use std::path::Path;
use std::process::{Command as StdCommand, Output, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::ExtractError;

/// Run a command, capture stdout/stderr, kill it after `timeout_secs`
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> Result<Output, ExtractError> {
    let mut command = TokioCommand::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::ToolNotFound(program.to_string())
        } else {
            ExtractError::Io(format!("Failed to start {}: {}", program, e))
        }
    })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| ExtractError::Io(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| ExtractError::Io(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status.map_err(|e| ExtractError::Io(format!("Failed to wait for {}: {}", program, e)))?;
            let stdout = stdout_task
                .await
                .map_err(|e| ExtractError::Io(format!("stdout task failed: {}", e)))??;
            let stderr = stderr_task
                .await
                .map_err(|e| ExtractError::Io(format!("stderr task failed: {}", e)))??;
            Ok(Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(ExtractError::Timeout {
                tool: program.to_string(),
                seconds: timeout_secs,
            })
        }
    }
}

/// Turn a finished process into an error when it exited non-zero
pub fn check_status(tool: &str, output: &Output) -> Result<(), ExtractError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    // Quota / 403 / 429 text gets its own classification
    match ExtractError::from(stderr.clone()) {
        ExtractError::Unknown(_) | ExtractError::Parse(_) | ExtractError::ToolNotFound(_) => {
            Err(ExtractError::ToolFailed {
                tool: tool.to_string(),
                code: output.status.code(),
                stderr,
            })
        }
        classified => Err(classified),
    }
}

/// Locate the yt-dlp binary: explicit path, common install paths, then `which`
pub fn find_ytdlp(explicit: Option<&str>) -> String {
    if let Some(path) = explicit.filter(|p| !p.trim().is_empty()) {
        return path.to_string();
    }

    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac / pip --user on Linux
        "/usr/bin/yt-dlp",          // System installation
        "/opt/python/bin/yt-dlp",   // Lambda layer
    ];

    for path in common_paths {
        if Path::new(path).exists() {
            return path.to_string();
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout);
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    "yt-dlp".to_string()
}

/// Find a Python interpreter (override via `YTDLP_PYTHON`)
pub fn find_python(explicit: Option<&str>) -> String {
    if let Some(cmd) = explicit.filter(|p| !p.trim().is_empty()) {
        return cmd.to_string();
    }

    let candidates = ["python3", "/opt/homebrew/bin/python3", "/usr/local/bin/python3"];
    for cmd in candidates {
        if let Ok(output) = StdCommand::new(cmd).arg("--version").output() {
            if output.status.success() {
                return cmd.to_string();
            }
        }
    }

    "python3".to_string()
}
