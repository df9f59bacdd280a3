//! Progress events streamed to attached clients
//!
//! Every event serializes to the same flat wire shape:
//!
//! ```text
//! { "type": "output", "timestamp": "2025-01-01T00:00:00Z", "message"?: "...", "data"?: ... }
//! ```
//!
//! The `type` discriminant selects the variant and each variant carries its
//! own typed payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::command::{CommandResult, CommandStatus};
use super::identifiers::CommandId;

/// Output stream a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl OutputStream {
    /// Stream name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of process output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Origin of the line
    pub stream: OutputStream,
    /// Line text without the trailing newline
    pub line: String,
}

/// Connection status payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    /// Command the status refers to
    pub command_id: CommandId,
    /// Short status word, e.g. `connected`
    pub status: String,
    /// Human-readable detail
    pub message: String,
}

/// Error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error description
    pub error: String,
}

/// Final event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// Command that finished
    pub command_id: CommandId,
    /// Terminal status
    pub status: CommandStatus,
    /// Wall-clock seconds since the session started, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

/// Event variants with their payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Lifecycle or connection status
    Status {
        /// Status text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Structured status
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<StatusData>,
    },
    /// Reasoning text from the external tool
    Thinking {
        /// Reasoning text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// One line of process output
    Output {
        /// The line and its origin
        data: OutputLine,
    },
    /// Tool invocation reported by the external tool
    ToolUse {
        /// Tool name or summary
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Tool input, passed through untouched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    /// Successful outcome, always immediately before `Complete`
    Result {
        /// Result payload
        data: CommandResult,
    },
    /// Failure description
    Error {
        /// Error text
        message: String,
        /// Structured error
        data: ErrorData,
    },
    /// Final event of a session
    Complete {
        /// Summary text
        message: String,
        /// Terminal status
        data: Completion,
    },
    /// Keep-alive or ping reply
    Ping,
}

/// A timestamped progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
    /// Variant and payload
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ProgressEvent {
    /// Wrap a variant with the current time
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Plain status message
    pub fn status(message: impl Into<String>) -> Self {
        Self::new(EventKind::Status {
            message: Some(message.into()),
            data: None,
        })
    }

    /// Greeting sent when a client attaches
    #[must_use]
    pub fn connected(command_id: &CommandId, message: impl Into<String>) -> Self {
        Self::new(EventKind::Status {
            message: None,
            data: Some(StatusData {
                command_id: command_id.clone(),
                status: "connected".to_string(),
                message: message.into(),
            }),
        })
    }

    /// Reasoning text
    pub fn thinking(message: impl Into<String>) -> Self {
        Self::new(EventKind::Thinking {
            message: Some(message.into()),
        })
    }

    /// Line of process output
    pub fn output(stream: OutputStream, line: impl Into<String>) -> Self {
        Self::new(EventKind::Output {
            data: OutputLine {
                stream,
                line: line.into(),
            },
        })
    }

    /// Tool invocation
    pub fn tool_use(name: impl Into<String>, input: Option<serde_json::Value>) -> Self {
        Self::new(EventKind::ToolUse {
            message: Some(name.into()),
            data: input,
        })
    }

    /// Successful result
    #[must_use]
    pub fn result(result: CommandResult) -> Self {
        Self::new(EventKind::Result { data: result })
    }

    /// Failure
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(EventKind::Error {
            data: ErrorData {
                error: message.clone(),
            },
            message,
        })
    }

    /// Final event
    pub fn complete(
        command_id: &CommandId,
        status: CommandStatus,
        execution_time: Option<f64>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::Complete {
            message: message.into(),
            data: Completion {
                command_id: command_id.clone(),
                status,
                execution_time,
            },
        })
    }

    /// Keep-alive
    #[must_use]
    pub fn ping() -> Self {
        Self::new(EventKind::Ping)
    }

    /// Wire discriminant
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            EventKind::Status { .. } => "status",
            EventKind::Thinking { .. } => "thinking",
            EventKind::Output { .. } => "output",
            EventKind::ToolUse { .. } => "tool_use",
            EventKind::Result { .. } => "result",
            EventKind::Error { .. } => "error",
            EventKind::Complete { .. } => "complete",
            EventKind::Ping => "ping",
        }
    }

    /// Whether this is the final event of a session
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.kind, EventKind::Complete { .. })
    }

    /// Terminal status carried by a `Complete` event
    #[must_use]
    pub fn completion_status(&self) -> Option<CommandStatus> {
        match &self.kind {
            EventKind::Complete { data, .. } => Some(data.status),
            _ => None,
        }
    }

    /// Output line carried by an `Output` event
    #[must_use]
    pub fn output_line(&self) -> Option<&OutputLine> {
        match &self.kind {
            EventKind::Output { data } => Some(data),
            _ => None,
        }
    }

    /// Serialize to the wire JSON text
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
