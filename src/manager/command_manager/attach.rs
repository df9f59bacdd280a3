//! Attaching a client to a session

use std::sync::Arc;

use crate::error::{CommandError, Result};
use crate::session::{EventReceiver, Session};
use crate::types::{CommandId, ProgressEvent};

use super::super::controller::LifecycleController;
use super::core::CommandManager;

/// A client's exclusive handle on one session's events
///
/// Borrows the session for the duration of one connection. Dropping it does
/// not cancel the session.
#[derive(Debug)]
pub struct Attachment {
    session: Arc<Session>,
    events: EventReceiver,
}

impl Attachment {
    /// Pair a session with the receiver taken from it
    ///
    /// [`CommandManager::attach`] does this and also starts the session;
    /// building one by hand leaves driving the session to the caller.
    #[must_use]
    pub fn new(session: Arc<Session>, events: EventReceiver) -> Self {
        Self { session, events }
    }

    /// The attached session
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Session id
    #[must_use]
    pub fn id(&self) -> &CommandId {
        self.session.id()
    }

    /// Next event; `None` once the session's final event has been consumed
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Read every remaining event
    pub async fn collect(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        events
    }
}

impl CommandManager {
    /// Take the event stream of a queued session and start it
    ///
    /// Only the first attach succeeds; the session's lifecycle controller is
    /// spawned as part of it.
    ///
    /// # Errors
    /// `SessionNotFound` for an unknown or finished session,
    /// `AlreadyAttached` if another client already took the stream
    pub fn attach(&self, id: &CommandId) -> Result<Attachment> {
        let session = self
            .registry
            .lookup(id)
            .ok_or_else(|| CommandError::session_not_found(id.as_str()))?;
        let (events, job) = session
            .take_pending()
            .ok_or_else(|| CommandError::AlreadyAttached(id.to_string()))?;

        let controller = LifecycleController::new(
            Arc::clone(&session),
            job,
            Arc::clone(&self.store),
            self.registry.guard(id.clone()),
        );
        tokio::spawn(controller.run());

        log::info!("[{id}] Client attached");
        Ok(Attachment { session, events })
    }
}
