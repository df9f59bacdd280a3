//! Bidirectional delivery

use crate::config::DeliveryConfig;
use crate::manager::Attachment;

use super::pump::pump;
use super::{ControlReceiver, DeliveryReport, EventSender};

/// Pump events to a duplex connection until the session completes
///
/// Inbound `interrupt` cancels the session and is acknowledged with a status
/// event; inbound `ping` is answered with a `ping`. A `ping` is also sent
/// after `config.keep_alive` without outbound traffic.
pub async fn run_duplex<S, R>(
    attachment: Attachment,
    sender: S,
    receiver: R,
    config: DeliveryConfig,
) -> DeliveryReport
where
    S: EventSender,
    R: ControlReceiver,
{
    pump(attachment, sender, receiver, config).await
}
