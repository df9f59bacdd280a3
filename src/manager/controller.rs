//! Lifecycle controller
//!
//! Drives one session from `queued` through `processing` to exactly one of
//! `completed`, `failed` or `interrupted`:
//!
//! 1. start the process and the multiplexer
//! 2. wait for the exit result and sample the cancellation token
//! 3. join both drains
//! 4. mark the session terminal, persist the record, then emit the final
//!    events and close the queue
//!
//! Persistence is best effort: failures are logged and the session carries
//! on. The controller always runs to completion, whether or not a client is
//! still reading.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::CommandError;
use crate::launcher::{LaunchSpec, launch};
use crate::registry::RegistryGuard;
use crate::session::{EventSink, Session, SessionJob};
use crate::store::CommandStore;
use crate::types::{CommandRecord, CommandResult, CommandStatus, ProgressEvent};

use super::helpers::{SessionOutcome, decide_outcome};
use super::multiplexer::Multiplexer;

/// Status message emitted before `complete` on interruption
pub const INTERRUPTED_MESSAGE: &str = "Command was interrupted";

/// Time the drains get to reach EOF after an interrupt that lost the race
const LATE_INTERRUPT_GRACE: Duration = Duration::from_millis(500);

/// Owner of one session's state machine
pub struct LifecycleController {
    session: Arc<Session>,
    store: Arc<dyn CommandStore>,
    record: CommandRecord,
    spec: LaunchSpec,
    success_result: CommandResult,
    sink: EventSink,
    _guard: RegistryGuard,
}

impl LifecycleController {
    /// Create a controller for `session`; `guard` removes it from the
    /// registry when the controller finishes
    pub fn new(
        session: Arc<Session>,
        job: SessionJob,
        store: Arc<dyn CommandStore>,
        guard: RegistryGuard,
    ) -> Self {
        Self {
            session,
            store,
            record: job.record,
            spec: job.spec,
            success_result: job.success_result,
            sink: job.sink,
            _guard: guard,
        }
    }

    /// Run to a terminal status
    pub async fn run(mut self) -> CommandStatus {
        let id = self.session.id().clone();
        let cancel = self.session.cancel_token();

        if cancel.is_cancelled() {
            log::info!("[{id}] Interrupted before start");
            return self.finish(SessionOutcome::Interrupted).await;
        }

        self.session.advance(CommandStatus::Processing);
        self.record.status = CommandStatus::Processing;
        self.persist().await;

        log::info!("[{id}] Processing: {}", self.record.prompt);
        log::debug!(
            "[{id}] Launching {} in {}",
            self.spec.display_command(),
            self.spec.working_dir.display()
        );

        let process = match launch(&self.spec, cancel.clone()) {
            Ok(process) => process,
            Err(e) => {
                log::error!("[{id}] Launch failed: {e}");
                let error = CommandError::Launch(e);
                return self.finish(SessionOutcome::failed(&error)).await;
            }
        };

        self.sink
            .push(ProgressEvent::status(format!("Starting {}...", self.spec.program)))
            .await;

        let mux = Multiplexer::spawn(process.stdout, process.stderr, &self.sink, cancel.clone(), &id);
        let exit = process.exit.wait().await;
        // Shield before sampling so the drains are only cut off when the
        // sample says the interrupt won
        mux.shield();
        let cancel_requested = cancel.is_cancelled();
        if cancel_requested {
            mux.stop();
        }
        let report = mux.join_until(cancel.clone(), LATE_INTERRUPT_GRACE).await;

        log::debug!(
            "[{id}] Exit {:?}, {} lines, cancel requested: {}",
            exit.as_ref().ok(),
            report.lines(),
            cancel_requested
        );

        let outcome = decide_outcome(cancel_requested, &exit, report.stream_error());
        self.finish(outcome).await
    }

    /// Persist the terminal record, then emit the final events
    async fn finish(mut self, outcome: SessionOutcome) -> CommandStatus {
        let id = self.session.id().clone();
        let status = outcome.status();
        // From here on interrupts report `already_finished`
        self.session.advance(status);

        self.record.status = status;
        self.record.completed_at = Some(Utc::now().timestamp());
        match &outcome {
            SessionOutcome::Completed => {
                self.record.result = match serde_json::to_string(&self.success_result) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        log::warn!("[{id}] Failed to encode result: {e}");
                        None
                    }
                };
            }
            SessionOutcome::Failed(message) => {
                self.record.error_message = Some(message.clone());
            }
            SessionOutcome::Interrupted => {}
        }
        self.persist().await;

        let events = match outcome {
            SessionOutcome::Completed => vec![
                ProgressEvent::result(self.success_result.clone()),
                ProgressEvent::complete(
                    &id,
                    status,
                    Some(self.session.uptime().as_secs_f64()),
                    "Command completed successfully",
                ),
            ],
            SessionOutcome::Failed(message) => vec![
                ProgressEvent::error(message),
                ProgressEvent::complete(&id, status, None, "Command failed"),
            ],
            SessionOutcome::Interrupted => vec![
                ProgressEvent::status(INTERRUPTED_MESSAGE),
                ProgressEvent::complete(&id, status, None, INTERRUPTED_MESSAGE),
            ],
        };

        let LifecycleController { sink, _guard, .. } = self;
        let delivered = sink.finish(events).await;
        log::info!("[{id}] Finished with status {status} ({delivered} final events queued)");
        status
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.record).await {
            log::warn!(
                "[{}] Failed to persist status {}: {}",
                self.record.id,
                self.record.status,
                e
            );
        }
    }
}
