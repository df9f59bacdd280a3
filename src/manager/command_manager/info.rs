//! Session snapshots and listing

use crate::error::{CommandError, Result};
use crate::session::Session;
use crate::types::{CommandId, SessionInfo};

use super::core::CommandManager;

fn snapshot(session: &Session) -> SessionInfo {
    SessionInfo {
        command_id: session.id().clone(),
        label: session.label().to_string(),
        status: session.status(),
        started_at: session.started_at(),
        uptime_ms: u64::try_from(session.uptime().as_millis()).unwrap_or(u64::MAX),
        attached: session.is_attached(),
        interrupt_requested: session.is_cancelled(),
    }
}

impl CommandManager {
    /// Snapshot of one live session
    ///
    /// # Errors
    /// `SessionNotFound` if the session is not live
    pub fn session_info(&self, id: &CommandId) -> Result<SessionInfo> {
        self.registry
            .lookup(id)
            .map(|session| snapshot(&session))
            .ok_or_else(|| CommandError::session_not_found(id.as_str()))
    }

    /// Snapshots of all live sessions, newest first
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .registry
            .list()
            .iter()
            .map(|session| snapshot(session))
            .collect();
        sessions.sort_by(|a, b| {
            b.started_at
                .cmp(&a.started_at)
                .then_with(|| b.command_id.cmp(&a.command_id))
        });
        sessions
    }
}
