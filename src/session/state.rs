//! Session state
//!
//! A [`Session`] is shared between the registry, the lifecycle controller and
//! at most one delivery adapter. Its status only moves forward and the
//! cancellation token is the single interrupt signal for every task of the
//! session.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::launcher::LaunchSpec;
use crate::types::{CommandId, CommandRecord, CommandResult, CommandStatus};

use super::queue::{EventQueue, EventReceiver, EventSink};

/// Work to run once a client attaches
#[derive(Debug)]
pub struct SessionJob {
    /// Record to keep updated in the store
    pub record: CommandRecord,
    /// Process to start
    pub spec: LaunchSpec,
    /// Payload of the `result` event on success
    pub success_result: CommandResult,
    /// Controller-side queue writer
    pub sink: EventSink,
}

/// Result of an interrupt request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// Cancellation signalled (or already signalled earlier)
    Requested,
    /// The session had already reached a terminal status
    AlreadyFinished,
}

impl InterruptOutcome {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "interrupt_requested",
            Self::AlreadyFinished => "already_finished",
        }
    }
}

/// One in-flight command
#[derive(Debug)]
pub struct Session {
    id: CommandId,
    label: String,
    status: Mutex<CommandStatus>,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
    started: Instant,
    pending: Mutex<Option<(EventReceiver, SessionJob)>>,
}

impl Session {
    /// Create a queued session with a fresh queue of `capacity` events
    #[must_use]
    pub fn new(
        record: CommandRecord,
        spec: LaunchSpec,
        success_result: CommandResult,
        label: impl Into<String>,
        capacity: usize,
    ) -> Self {
        let (sink, receiver) = EventQueue::bounded(capacity);
        let job = SessionJob {
            record,
            spec,
            success_result,
            sink,
        };
        Self {
            id: job.record.id.clone(),
            label: label.into(),
            status: Mutex::new(CommandStatus::Queued),
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
            started: Instant::now(),
            pending: Mutex::new(Some((receiver, job))),
        }
    }

    /// Session id
    #[must_use]
    pub fn id(&self) -> &CommandId {
        &self.id
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        *self.status.lock()
    }

    /// Move to `next` if that is a forward transition
    ///
    /// Returns `false` and leaves the status untouched otherwise; terminal
    /// statuses never change.
    pub fn advance(&self, next: CommandStatus) -> bool {
        let mut status = self.status.lock();
        if status.can_advance_to(next) {
            *status = next;
            true
        } else {
            false
        }
    }

    /// Clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether an interrupt was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request cancellation
    ///
    /// Idempotent. A session in a terminal status is left alone.
    pub fn interrupt(&self) -> InterruptOutcome {
        let status = self.status.lock();
        if status.is_terminal() {
            return InterruptOutcome::AlreadyFinished;
        }
        self.cancel.cancel();
        InterruptOutcome::Requested
    }

    /// Wall-clock submission time
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since submission
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the event queue has been handed out
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.pending.lock().is_none()
    }

    /// Take the event receiver and job, once
    pub fn take_pending(&self) -> Option<(EventReceiver, SessionJob)> {
        self.pending.lock().take()
    }
}
