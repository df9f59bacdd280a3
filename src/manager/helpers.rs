//! Pure helpers for the lifecycle controller
//!
//! Outcome arbitration lives here so it can be tested without processes.

use std::io;

use crate::error::CommandError;
use crate::launcher::{ExitOutcome, ProcessExit};
use crate::types::CommandStatus;

/// Maximum label length derived from a prompt
const LABEL_MAX_CHARS: usize = 60;

/// Terminal outcome of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Process exited cleanly
    Completed,
    /// Launch, stream or exit failure with its description
    Failed(String),
    /// Cancellation won
    Interrupted,
}

impl SessionOutcome {
    /// Status recorded for this outcome
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        match self {
            Self::Completed => CommandStatus::Completed,
            Self::Failed(_) => CommandStatus::Failed,
            Self::Interrupted => CommandStatus::Interrupted,
        }
    }

    /// Failure with the message of `error`
    #[must_use]
    pub fn failed(error: &CommandError) -> Self {
        Self::Failed(error.to_string())
    }
}

/// Decide how a session ended
///
/// `cancel_requested` is the cancellation state sampled when the controller
/// observed the exit result. Cancellation wins only if it was requested
/// before that point (or the launcher itself killed the process for it).
/// Otherwise a wait failure, nonzero exit or read failure is a failure, in
/// that order.
#[must_use]
pub fn decide_outcome(
    cancel_requested: bool,
    exit: &io::Result<ProcessExit>,
    stream_error: Option<CommandError>,
) -> SessionOutcome {
    if cancel_requested {
        return SessionOutcome::Interrupted;
    }
    match exit {
        Err(e) => SessionOutcome::Failed(format!("Failed waiting for process: {e}")),
        Ok(exit) => match exit.outcome() {
            ExitOutcome::Cancelled => SessionOutcome::Interrupted,
            ExitOutcome::Failed(code) => SessionOutcome::failed(&CommandError::process_exit(code)),
            ExitOutcome::Success => match stream_error {
                Some(error) => SessionOutcome::failed(&error),
                None => SessionOutcome::Completed,
            },
        },
    }
}

/// Short single-line label for listings
pub(super) fn label_for(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= LABEL_MAX_CHARS {
        return line.to_string();
    }
    let mut label: String = line.chars().take(LABEL_MAX_CHARS - 3).collect();
    label.push_str("...");
    label
}
