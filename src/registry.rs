//! Live session registry
//!
//! The only state shared across sessions. Lookups dominate, so the map sits
//! behind a reader/writer lock; no lock is held across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{CommandError, Result};
use crate::session::Session;
use crate::types::CommandId;

/// Process-wide map from command id to live [`Session`]
///
/// Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<CommandId, Arc<Session>>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its id
    ///
    /// # Errors
    /// Returns `DuplicateSession` if the id is already registered
    pub fn register(&self, session: Arc<Session>) -> Result<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session.id()) {
            return Err(CommandError::DuplicateSession(session.id().to_string()));
        }
        sessions.insert(session.id().clone(), session);
        Ok(())
    }

    /// Find a live session
    #[must_use]
    pub fn lookup(&self, id: &CommandId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session; removing an unknown id is a no-op
    pub fn remove(&self, id: &CommandId) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    /// Guard that removes `id` when dropped
    #[must_use]
    pub fn guard(&self, id: CommandId) -> RegistryGuard {
        RegistryGuard {
            registry: self.clone(),
            id,
        }
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Snapshot of all live sessions
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }
}

/// Removes a session from the registry on every exit path of its owner
pub struct RegistryGuard {
    registry: SessionRegistry,
    id: CommandId,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            log::debug!("Session {} removed from registry", self.id);
        }
    }
}
