//! Core command manager structure and lifecycle management

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::ManagerConfig;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::store::CommandStore;
use crate::types::CommandStatus;

// ============================================================================
// COMMAND MANAGER CORE
// ============================================================================

/// Composition root for command sessions
///
/// Owns the session registry and the record store, and runs a background
/// sweep that abandons sessions no client ever attached to.
pub struct CommandManager {
    pub(crate) registry: SessionRegistry,
    pub(crate) store: Arc<dyn CommandStore>,
    pub(crate) config: ManagerConfig,
    sweep_handle: Option<tokio::task::JoinHandle<()>>,
}

impl CommandManager {
    /// Create a manager and start its sweep task
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(store: Arc<dyn CommandStore>, config: ManagerConfig) -> Self {
        let registry = SessionRegistry::new();

        let sweep_handle = {
            let registry = registry.clone();
            let store = Arc::clone(&store);
            let ttl = config.queued_session_ttl;
            let interval = config.sweep_interval.max(Duration::from_millis(10));
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    let swept = sweep(&registry, store.as_ref(), Some(ttl)).await;
                    if swept > 0 {
                        log::info!("Abandoned {swept} unattached session(s)");
                    }
                }
            })
        };

        Self {
            registry,
            store,
            config,
            sweep_handle: Some(sweep_handle),
        }
    }

    /// Live session registry
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Record store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CommandStore> {
        &self.store
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Abandon sessions that have waited longer than the configured TTL
    /// for a client, returning how many were removed
    pub async fn sweep_abandoned(&self) -> usize {
        sweep(&self.registry, self.store.as_ref(), Some(self.config.queued_session_ttl)).await
    }

    /// Interrupt every live session
    ///
    /// Running sessions finish as `interrupted` through their controllers;
    /// sessions never attached are finalized here. Returns the number of
    /// sessions that were signalled.
    pub async fn shutdown(&self) -> usize {
        log::info!("Shutting down CommandManager...");

        let sessions = self.registry.list();
        let mut signalled = 0;
        for session in &sessions {
            log::debug!("Interrupting session: {}", session.id());
            if session.interrupt() == crate::session::InterruptOutcome::Requested {
                signalled += 1;
            }
        }
        sweep(&self.registry, self.store.as_ref(), None).await;

        log::info!("CommandManager shutdown complete ({signalled} session(s) interrupted)");
        signalled
    }
}

impl Drop for CommandManager {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
    }
}

/// Finalize unattached sessions older than `ttl` (all of them for `None`)
async fn sweep(registry: &SessionRegistry, store: &dyn CommandStore, ttl: Option<Duration>) -> usize {
    let mut swept = 0;
    for session in registry.list() {
        if session.is_attached() || ttl.is_some_and(|ttl| session.uptime() < ttl) {
            continue;
        }
        if finalize_unattached(registry, store, &session).await.is_some() {
            swept += 1;
        }
    }
    swept
}

/// Finish a session no client ever attached to
///
/// An interrupted session ends as `interrupted`, anything else as `failed`.
/// Returns `None` if a client took the session first.
pub(super) async fn finalize_unattached(
    registry: &SessionRegistry,
    store: &dyn CommandStore,
    session: &Session,
) -> Option<CommandStatus> {
    let (_events, job) = session.take_pending()?;

    let mut record = job.record;
    let status = if session.is_cancelled() {
        CommandStatus::Interrupted
    } else {
        record.error_message = Some("No client attached before the session expired".to_string());
        CommandStatus::Failed
    };
    session.advance(status);
    record.status = status;
    record.completed_at = Some(Utc::now().timestamp());
    if let Err(e) = store.save(&record).await {
        log::warn!("[{}] Failed to persist status {}: {}", record.id, status, e);
    }
    registry.remove(session.id());
    log::info!("[{}] Finished without a client as {}", session.id(), status);
    Some(status)
}
