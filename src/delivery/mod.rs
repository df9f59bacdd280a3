//! Delivery adapters
//!
//! Pump a session's events to one client connection. The transport is
//! abstracted behind [`EventSender`] (outbound) and [`ControlReceiver`]
//! (inbound, duplex only).
//!
//! Closing the client connection never cancels the session: on a write
//! failure or client close the adapter stops writing but keeps draining the
//! queue until the session's `complete` event, so the controller and the
//! process run to completion in the background.
//!
//! - `duplex` - Bidirectional connections (interrupt and ping relay)
//! - `push` - Push-only connections

mod duplex;
mod pump;
mod push;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::{CommandError, Result};
use crate::types::{ControlMessage, ProgressEvent};

pub use duplex::run_duplex;
pub use push::run_push;

/// Greeting sent as the first event of every connection
pub const CONNECTED_MESSAGE: &str = "Connected to command stream";

/// Reply to an inbound interrupt on a duplex connection
pub const INTERRUPT_ACK_MESSAGE: &str = "Interrupt signal received";

/// Outbound half of a client connection
pub trait EventSender: Send {
    /// Write one event to the client
    ///
    /// # Errors
    /// Returns a transport error if the write fails
    fn send(&mut self, event: &ProgressEvent) -> impl Future<Output = Result<()>> + Send;
}

/// Inbound half of a duplex client connection
pub trait ControlReceiver: Send {
    /// Next control message, `None` once the client has closed
    ///
    /// Must be cancel-safe: a pending call may be dropped without losing a
    /// message.
    fn receive(&mut self) -> impl Future<Output = Option<ControlMessage>> + Send;
}

impl EventSender for mpsc::Sender<ProgressEvent> {
    async fn send(&mut self, event: &ProgressEvent) -> Result<()> {
        mpsc::Sender::send(self, event.clone())
            .await
            .map_err(|_| CommandError::transport("connection closed"))
    }
}

impl ControlReceiver for mpsc::Receiver<ControlMessage> {
    async fn receive(&mut self) -> Option<ControlMessage> {
        self.recv().await
    }
}

/// What happened on one connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events written to the client, keep-alives included
    pub delivered: usize,
    /// Session events drained without being written
    pub discarded: usize,
    /// Keep-alive pings written
    pub keep_alives: usize,
    /// Whether the session's `complete` event was seen
    pub completed: bool,
    /// Interrupts relayed from the client
    pub interrupts: usize,
    /// Write failure that detached the client
    pub transport_error: Option<String>,
    /// Whether the client closed its inbound side
    pub client_closed: bool,
}
