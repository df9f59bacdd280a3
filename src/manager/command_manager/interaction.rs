//! Interrupts and status queries

use crate::error::{CommandError, Result};
use crate::session::InterruptOutcome;
use crate::types::{CommandId, CommandRecord};

use super::core::{CommandManager, finalize_unattached};

impl CommandManager {
    /// Interrupt a session by id
    ///
    /// A session no client has attached to yet is finished right away as
    /// `interrupted`. A finished session that is no longer live yields
    /// [`InterruptOutcome::AlreadyFinished`] as long as its record exists.
    ///
    /// # Errors
    /// `SessionNotFound` if neither a live session nor a finished record exists
    pub async fn interrupt(&self, id: &CommandId) -> Result<InterruptOutcome> {
        if let Some(session) = self.registry.lookup(id) {
            let outcome = session.interrupt();
            log::info!("[{id}] Interrupt: {}", outcome.as_str());
            if outcome == InterruptOutcome::Requested && !session.is_attached() {
                finalize_unattached(&self.registry, self.store.as_ref(), &session).await;
            }
            return Ok(outcome);
        }

        match self.store.get(id).await {
            Ok(record) if record.status.is_terminal() => Ok(InterruptOutcome::AlreadyFinished),
            Ok(_) | Err(CommandError::CommandNotFound(_)) => {
                Err(CommandError::session_not_found(id.as_str()))
            }
            Err(e) => Err(e),
        }
    }

    /// Current record of a command
    ///
    /// The live session status is overlaid when the store lags behind it.
    ///
    /// # Errors
    /// `CommandNotFound` for an unknown id
    pub async fn status(&self, id: &CommandId) -> Result<CommandRecord> {
        let mut record = self.store.get(id).await?;
        if let Some(session) = self.registry.lookup(id) {
            let live = session.status();
            if record.status.can_advance_to(live) {
                record.status = live;
            }
        }
        Ok(record)
    }
}
