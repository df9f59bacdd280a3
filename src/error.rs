//! Error types for command sessions

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a process could not be started
///
/// Launch failures are observed synchronously: when one of these is returned
/// no process exists and no output streams were produced.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Executable could not be resolved on `PATH` or at the given location
    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    /// Working directory does not exist or is not a directory
    #[error("working directory does not exist: {}", .0.display())]
    WorkingDirectoryMissing(PathBuf),

    /// The operating system refused to execute the program
    #[error("permission denied executing {0}")]
    PermissionDenied(String),

    /// Any other spawn failure
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Spawned child did not expose a requested pipe
    #[error("failed to capture {0} of spawned process")]
    MissingPipe(&'static str),
}

/// Main error type for command sessions
#[derive(Error, Debug)]
pub enum CommandError {
    /// The external process could not be started
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Reading one of the process output pipes failed mid-execution
    #[error("Stream error on {stream}: {message}")]
    Stream {
        /// Which output stream failed
        stream: String,
        /// Error message
        message: String,
    },

    /// The session was interrupted by the user
    #[error("Command was interrupted")]
    Cancelled,

    /// The process exited unsuccessfully without being cancelled
    #[error("Process exited with {}", describe_exit(.code))]
    ProcessExit {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// Sending to or receiving from an attached client failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The command store rejected a write or read
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A session with this id is already registered
    #[error("Session already registered: {0}")]
    DuplicateSession(String),

    /// No live session with this id
    #[error("Command session not found: {0}")]
    SessionNotFound(String),

    /// No stored command record with this id
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Another client already consumes this session's events
    #[error("Command session {0} already has a client attached")]
    AlreadyAttached(String),

    /// Rejected submission
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Submission without a prompt
    #[error("Prompt is required")]
    MissingPrompt,

    /// Submission with an unknown scope value
    #[error("Invalid scope '{0}': scope must be one of current-page, new-page, global")]
    InvalidScope(String),

    /// Identifier is malformed
    #[error("Invalid command id: {0}")]
    InvalidCommandId(String),

    /// Operation disabled by configuration
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode or decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

/// Result type alias for command session operations
pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    /// Create a stream error
    pub fn stream(stream: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Stream {
            stream: stream.into(),
            message: msg.into(),
        }
    }

    /// Create a process exit error
    #[must_use]
    pub fn process_exit(code: Option<i32>) -> Self {
        Self::ProcessExit { code }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a session not found error
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound(id.into())
    }

    /// Create a command not found error
    pub fn command_not_found(id: impl Into<String>) -> Self {
        Self::CommandNotFound(id.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Stable machine-readable code used in API error bodies
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Launch(_) => "LAUNCH_ERROR",
            Self::Stream { .. } => "STREAM_ERROR",
            Self::Cancelled => "INTERRUPTED",
            Self::ProcessExit { .. } => "PROCESS_EXIT",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Persistence(_) => "DATABASE_ERROR",
            Self::DuplicateSession(_) => "DUPLICATE_SESSION",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::CommandNotFound(_) => "COMMAND_NOT_FOUND",
            Self::AlreadyAttached(_) => "ALREADY_ATTACHED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::MissingPrompt => "MISSING_PROMPT",
            Self::InvalidScope(_) => "INVALID_SCOPE",
            Self::InvalidCommandId(_) => "INVALID_COMMAND_ID",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "INVALID_JSON",
        }
    }
}
