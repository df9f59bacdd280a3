//! Spawning and supervising the external process

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

use crate::error::LaunchError;

use super::command::LaunchSpec;
use super::config::is_allowed_env;

/// A started process
///
/// Both output pipes are owned by the caller; the exit handle owns the child.
#[derive(Debug)]
pub struct LaunchedProcess {
    /// OS process id, if still known
    pub pid: Option<u32>,
    /// Standard output pipe
    pub stdout: ChildStdout,
    /// Standard error pipe
    pub stderr: ChildStderr,
    /// Exit result handle
    pub exit: ExitHandle,
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Whether the launcher killed the process because of cancellation
    pub cancelled: bool,
}

/// Classified exit result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited with status 0
    Success,
    /// Exited nonzero or by a foreign signal
    Failed(Option<i32>),
    /// Terminated because the session was cancelled
    Cancelled,
}

impl ProcessExit {
    fn from_status(status: ExitStatus, cancelled: bool) -> Self {
        Self {
            code: status.code(),
            cancelled,
        }
    }

    /// Classify the exit
    #[must_use]
    pub fn outcome(&self) -> ExitOutcome {
        if self.cancelled {
            ExitOutcome::Cancelled
        } else if self.code == Some(0) {
            ExitOutcome::Success
        } else {
            ExitOutcome::Failed(self.code)
        }
    }

    /// Exited cleanly without cancellation
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome() == ExitOutcome::Success
    }
}

/// Future-like handle resolving to the process exit
#[derive(Debug)]
pub struct ExitHandle {
    child: Child,
    cancel: CancellationToken,
    program: String,
}

impl ExitHandle {
    /// Wait for the process to exit
    ///
    /// If the cancellation token fires first the process is killed and the
    /// result is marked as cancelled.
    ///
    /// # Errors
    /// Returns error if waiting on the child fails
    pub async fn wait(mut self) -> io::Result<ProcessExit> {
        tokio::select! {
            biased;
            status = self.child.wait() => Ok(ProcessExit::from_status(status?, false)),
            () = self.cancel.cancelled() => {
                log::debug!("Cancellation requested, killing {}", self.program);
                if let Err(e) = self.child.start_kill() {
                    // Already reaped or exited between the two branches
                    log::debug!("Kill of {} failed: {}", self.program, e);
                }
                let status = self.child.wait().await?;
                Ok(ProcessExit::from_status(status, true))
            }
        }
    }
}

/// Start the process described by `spec`
///
/// Fails synchronously when the working directory is missing, the executable
/// cannot be resolved, or the OS refuses to run it. On success both output
/// pipes are open and the process is already running.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
/// Returns a [`LaunchError`] describing why no process was started
pub fn launch(spec: &LaunchSpec, cancel: CancellationToken) -> Result<LaunchedProcess, LaunchError> {
    if !spec.working_dir.is_dir() {
        return Err(LaunchError::WorkingDirectoryMissing(spec.working_dir.clone()));
    }

    let program = resolve_program(&spec.program)?;
    let mut cmd = Command::new(&program);
    cmd.args(&spec.args);

    let mut process_env = HashMap::new();
    for (key, value) in &spec.env {
        if is_allowed_env(key) {
            process_env.insert(key.clone(), value.clone());
        } else {
            log::warn!("Dropping disallowed environment variable {key} for {}", spec.program);
        }
    }
    process_env.insert(
        "PWD".to_string(),
        spec.working_dir.to_string_lossy().to_string(),
    );
    cmd.envs(process_env).current_dir(&spec.working_dir);

    // stdin is closed; the prompt travels as an argument
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| spawn_error(&spec.program, &spec.working_dir, e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or(LaunchError::MissingPipe("stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or(LaunchError::MissingPipe("stderr"))?;

    let pid = child.id();
    log::debug!(
        "Launched {} (pid {:?}) in {}",
        spec.display_command(),
        pid,
        spec.working_dir.display()
    );

    Ok(LaunchedProcess {
        pid,
        stdout,
        stderr,
        exit: ExitHandle {
            child,
            cancel,
            program: spec.program.clone(),
        },
    })
}

/// Resolve a bare executable name on `PATH`, or check that a path exists
fn resolve_program(program: &str) -> Result<PathBuf, LaunchError> {
    if program.trim().is_empty() {
        return Err(LaunchError::ExecutableNotFound(program.to_string()));
    }
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let path = PathBuf::from(program);
        return if path.exists() {
            Ok(path)
        } else {
            Err(LaunchError::ExecutableNotFound(program.to_string()))
        };
    }
    which::which(program).map_err(|_| LaunchError::ExecutableNotFound(program.to_string()))
}

fn spawn_error(program: &str, working_dir: &Path, e: io::Error) -> LaunchError {
    match e.kind() {
        io::ErrorKind::NotFound if !working_dir.exists() => {
            LaunchError::WorkingDirectoryMissing(working_dir.to_path_buf())
        }
        io::ErrorKind::NotFound => LaunchError::ExecutableNotFound(program.to_string()),
        io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied(program.to_string()),
        _ => LaunchError::Spawn {
            program: program.to_string(),
            source: e,
        },
    }
}
