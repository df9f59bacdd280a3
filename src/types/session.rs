//! Live session snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::command::CommandStatus;
use super::identifiers::CommandId;

/// Point-in-time view of a live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Command id
    pub command_id: CommandId,
    /// Short label derived from the prompt or command line
    pub label: String,
    /// Current status
    pub status: CommandStatus,
    /// Submission time
    pub started_at: DateTime<Utc>,
    /// Milliseconds since submission
    pub uptime_ms: u64,
    /// Whether a client has taken the event stream
    pub attached: bool,
    /// Whether an interrupt was requested
    pub interrupt_requested: bool,
}
