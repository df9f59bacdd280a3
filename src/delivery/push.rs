//! Push-only delivery
//!
//! There is no inbound channel; interrupts arrive out of band through
//! [`crate::CommandManager::interrupt`].

use crate::config::DeliveryConfig;
use crate::manager::Attachment;

use super::pump::{NoControl, pump};
use super::{DeliveryReport, EventSender};

/// Pump events to a push-only connection until the session completes
pub async fn run_push<S>(attachment: Attachment, sender: S, config: DeliveryConfig) -> DeliveryReport
where
    S: EventSender,
{
    pump(attachment, sender, NoControl, config).await
}
