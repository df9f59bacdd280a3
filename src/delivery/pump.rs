//! Event pump shared by both adapters

use std::future::pending;

use tokio::time::{Instant, sleep};

use crate::config::DeliveryConfig;
use crate::manager::Attachment;
use crate::session::InterruptOutcome;
use crate::types::{ControlMessage, ProgressEvent};

use super::{
    CONNECTED_MESSAGE, ControlReceiver, DeliveryReport, EventSender, INTERRUPT_ACK_MESSAGE,
};

/// Control receiver of push-only connections: never yields
pub(super) struct NoControl;

impl ControlReceiver for NoControl {
    async fn receive(&mut self) -> Option<ControlMessage> {
        pending().await
    }
}

struct Writer<S> {
    sender: S,
    live: bool,
    report: DeliveryReport,
}

impl<S: EventSender> Writer<S> {
    async fn write(&mut self, event: &ProgressEvent) {
        if !self.live {
            self.report.discarded += 1;
            return;
        }
        match self.sender.send(event).await {
            Ok(()) => self.report.delivered += 1,
            Err(e) => {
                log::warn!("Client transport failed, detaching: {e}");
                self.report.transport_error = Some(e.to_string());
                self.live = false;
            }
        }
    }
}

/// Forward events until the session completes
pub(super) async fn pump<S, R>(
    mut attachment: Attachment,
    sender: S,
    mut control: R,
    config: DeliveryConfig,
) -> DeliveryReport
where
    S: EventSender,
    R: ControlReceiver,
{
    let id = attachment.id().clone();
    let mut writer = Writer {
        sender,
        live: true,
        report: DeliveryReport::default(),
    };
    let mut inbound_open = true;

    writer
        .write(&ProgressEvent::connected(&id, CONNECTED_MESSAGE))
        .await;

    let keep_alive = sleep(config.keep_alive);
    tokio::pin!(keep_alive);

    loop {
        tokio::select! {
            event = attachment.next_event() => {
                let Some(event) = event else {
                    break;
                };
                let last = event.is_complete();
                writer.write(&event).await;
                if last {
                    writer.report.completed = true;
                    break;
                }
                keep_alive.as_mut().reset(Instant::now() + config.keep_alive);
            }
            message = control.receive(), if inbound_open && writer.live => {
                match message {
                    Some(ControlMessage::Interrupt) => {
                        let outcome = attachment.session().interrupt();
                        log::info!("[{id}] Interrupt from client: {}", outcome.as_str());
                        if outcome == InterruptOutcome::Requested {
                            writer.report.interrupts += 1;
                        }
                        writer.write(&ProgressEvent::status(INTERRUPT_ACK_MESSAGE)).await;
                    }
                    Some(ControlMessage::Ping) => {
                        writer.write(&ProgressEvent::ping()).await;
                    }
                    None => {
                        log::info!("[{id}] Client closed, session keeps running");
                        inbound_open = false;
                        writer.report.client_closed = true;
                        writer.live = false;
                        continue;
                    }
                }
                keep_alive.as_mut().reset(Instant::now() + config.keep_alive);
            }
            () = &mut keep_alive, if writer.live => {
                writer.write(&ProgressEvent::ping()).await;
                writer.report.keep_alives += 1;
                keep_alive.as_mut().reset(Instant::now() + config.keep_alive);
            }
        }
    }

    let report = writer.report;
    log::debug!(
        "[{id}] Delivery finished: {} delivered, {} discarded",
        report.delivered,
        report.discarded
    );
    report
}
