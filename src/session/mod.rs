//! Per-command session state
//!
//! - `queue` - Bounded event queue with a single final-events writer
//! - `state` - `Session`: identity, status, cancellation, pending run

mod queue;
mod state;

pub use queue::{EventQueue, EventReceiver, EventSink, ProducerSink};
pub use state::{InterruptOutcome, Session, SessionJob};
