//! Bounded event queue
//!
//! One [`EventReceiver`] consumes. Producers hold either the [`EventSink`]
//! (owned by the lifecycle controller) or cancellable [`ProducerSink`] clones
//! handed to the output drains. Pushes wait while the queue is full; nothing
//! is dropped except after cancellation or when the receiver is gone.
//!
//! `Complete` events can only be written through [`EventSink::finish`], which
//! consumes the sink. Once every producer is dropped the queue is closed.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::ProgressEvent;

/// Constructor for bounded event queues
pub struct EventQueue;

impl EventQueue {
    /// Create a queue holding at most `capacity` events (minimum 1)
    #[must_use]
    pub fn bounded(capacity: usize) -> (EventSink, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventSink { tx }, EventReceiver { rx })
    }
}

/// Controller-side writer
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl EventSink {
    /// Writer for one output drain that gives up when `cancel` fires
    #[must_use]
    pub fn producer(&self, cancel: CancellationToken) -> ProducerSink {
        ProducerSink {
            tx: self.tx.clone(),
            cancel,
        }
    }

    /// Push a non-final event, waiting for space
    ///
    /// Returns `false` if the receiver is gone or the event is a `Complete`.
    pub async fn push(&self, event: ProgressEvent) -> bool {
        if event.is_complete() {
            log::warn!("Refusing to push a complete event outside finish()");
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    /// Write the final events and close this writer
    ///
    /// The last event should be the session's `Complete`. Returns how many
    /// events reached the queue.
    pub async fn finish(self, events: Vec<ProgressEvent>) -> usize {
        let mut delivered = 0;
        for event in events {
            if self.tx.send(event).await.is_err() {
                break;
            }
            delivered += 1;
        }
        delivered
    }
}

/// Cancellable writer used by the output drains
#[derive(Debug, Clone)]
pub struct ProducerSink {
    tx: mpsc::Sender<ProgressEvent>,
    cancel: CancellationToken,
}

impl ProducerSink {
    /// Push one event, waiting for space unless cancelled
    ///
    /// Returns `false` when the producer should stop: cancellation fired, the
    /// receiver is gone, or the event was a `Complete`.
    pub async fn push(&self, event: ProgressEvent) -> bool {
        if event.is_complete() {
            log::warn!("Output producers cannot emit complete events");
            return false;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    /// Whether the session was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this producer has been told to stop
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

/// Single consumer of a session's events
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl EventReceiver {
    /// Next event, `None` once all writers are gone and the queue is empty
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Number of events currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
