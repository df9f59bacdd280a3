//! Command records, submission requests and lifecycle status
//!
//! `CommandRecord` is the durable view of one submitted command. The live
//! view is the in-memory `Session`; the record is what clients poll after
//! losing their connection.

use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::identifiers::CommandId;
use crate::error::{CommandError, Result};

// ============================================================================
// Lifecycle status
// ============================================================================

/// Lifecycle status of a command
///
/// Transitions only move forward: `Queued` → `Processing` → one of the
/// terminal states. `Queued` may also go straight to a terminal state when a
/// session is interrupted or abandoned before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Submitted, waiting for a client to attach
    Queued,
    /// External process running
    Processing,
    /// Process exited successfully
    Completed,
    /// Launch, stream or exit failure
    Failed,
    /// Cancelled by the user
    Interrupted,
}

impl CommandStatus {
    /// Whether no further transition is allowed
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Interrupted)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed | Self::Interrupted => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the state machine
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    /// Wire name of the status
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Submission requests
// ============================================================================

/// Where a command applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandScope {
    /// Only the page the user is looking at
    #[serde(rename = "current-page")]
    CurrentPage,
    /// A page that does not exist yet
    #[serde(rename = "new-page")]
    NewPage,
    /// The whole project
    #[serde(rename = "global")]
    Global,
}

impl CommandScope {
    /// Parse the wire representation
    ///
    /// # Errors
    /// Returns `InvalidScope` for any other value
    pub fn parse(scope: &str) -> Result<Self> {
        match scope {
            "current-page" => Ok(Self::CurrentPage),
            "new-page" => Ok(Self::NewPage),
            "global" => Ok(Self::Global),
            other => Err(CommandError::InvalidScope(other.to_string())),
        }
    }

    /// Wire name of the scope
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CurrentPage => "current-page",
            Self::NewPage => "new-page",
            Self::Global => "global",
        }
    }
}

/// Environment the command was issued from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    /// Page the user was on
    #[serde(default)]
    pub page: String,
    /// Client-side timestamp, informational only
    #[serde(default)]
    pub timestamp: String,
    /// Issuing user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Owning project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// Natural-language command submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// What the user asked for
    #[serde(default)]
    pub prompt: String,
    /// `current-page`, `new-page` or `global`
    #[serde(default)]
    pub scope: String,
    /// Issuing context
    #[serde(default)]
    pub context: CommandContext,
}

impl CommandRequest {
    /// Validate the request and return its parsed scope
    ///
    /// # Errors
    /// `MissingPrompt` for a blank prompt, `InvalidScope` for an unknown scope
    pub fn validate(&self) -> Result<CommandScope> {
        if self.prompt.trim().is_empty() {
            return Err(CommandError::MissingPrompt);
        }
        CommandScope::parse(&self.scope)
    }
}

/// Direct execution of an arbitrary executable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Executable name or path
    pub command: String,
    /// Arguments passed verbatim
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, defaults to the configured workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ProcessRequest {
    /// Validate the request
    ///
    /// # Errors
    /// `InvalidRequest` when no command is given
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(CommandError::invalid_request("Command is required"));
        }
        Ok(())
    }
}

// ============================================================================
// Durable record
// ============================================================================

/// Durable record of one submitted command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Same as the session id
    pub id: CommandId,
    /// What was asked, or the command line for direct executions
    pub prompt: String,
    /// Scope of AI commands, empty for direct executions
    #[serde(default)]
    pub scope: String,
    /// Page the command was issued from
    #[serde(default)]
    pub page: String,
    /// Issuing user
    #[serde(default)]
    pub user_id: Option<String>,
    /// Owning project
    #[serde(default)]
    pub project_id: Option<String>,
    /// Current lifecycle status
    pub status: CommandStatus,
    /// JSON-encoded `CommandResult`, only on success
    #[serde(default)]
    pub result: Option<String>,
    /// Failure description, only on failure
    #[serde(default)]
    pub error_message: Option<String>,
    /// Unix seconds at submission
    pub created_at: i64,
    /// Unix seconds at the terminal transition
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl CommandRecord {
    /// Build a queued record for an AI command submission
    #[must_use]
    pub fn queued(id: CommandId, request: &CommandRequest, scope: CommandScope) -> Self {
        Self {
            id,
            prompt: request.prompt.clone(),
            scope: scope.as_str().to_string(),
            page: request.context.page.clone(),
            user_id: request.context.user_id.clone(),
            project_id: request.context.project_id.clone(),
            status: CommandStatus::Queued,
            result: None,
            error_message: None,
            created_at: Utc::now().timestamp(),
            completed_at: None,
        }
    }

    /// Build a queued record for a direct execution
    #[must_use]
    pub fn queued_process(id: CommandId, request: &ProcessRequest) -> Self {
        let mut prompt = request.command.clone();
        for arg in &request.args {
            prompt.push(' ');
            prompt.push_str(arg);
        }
        Self {
            id,
            prompt,
            scope: String::new(),
            page: String::new(),
            user_id: None,
            project_id: None,
            status: CommandStatus::Queued,
            result: None,
            error_message: None,
            created_at: Utc::now().timestamp(),
            completed_at: None,
        }
    }

    /// Decoded result payload, if the command succeeded
    #[must_use]
    pub fn decoded_result(&self) -> Option<serde_json::Value> {
        self.result
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

// ============================================================================
// Result payload
// ============================================================================

/// One change reported by a successful command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Kind of change, e.g. `update`
    #[serde(rename = "type")]
    pub change_type: String,
    /// What was changed
    pub target: String,
    /// Human-readable summary
    pub description: String,
}

/// Payload of the `result` event and of the stored record on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Summary of what was done
    pub action: String,
    /// Pages touched by the command
    pub affected_pages: Vec<String>,
    /// Individual changes
    pub changes: Vec<Change>,
}

impl CommandResult {
    /// Result for a successful AI command on `page`
    #[must_use]
    pub fn for_page(page: &str, executable: &str) -> Self {
        Self {
            action: format!("Executed command for {page}"),
            affected_pages: vec![page.to_string()],
            changes: vec![Change {
                change_type: "update".to_string(),
                target: page.to_string(),
                description: format!("Applied changes via {executable}"),
            }],
        }
    }

    /// Result for a successful direct execution
    #[must_use]
    pub fn for_process(executable: &str) -> Self {
        Self {
            action: format!("Executed {executable}"),
            affected_pages: Vec::new(),
            changes: Vec::new(),
        }
    }
}
