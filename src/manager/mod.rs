//! Command session management
//!
//! Provides `CommandManager` for submitting, attaching to, interrupting and
//! inspecting command sessions, each run by its own lifecycle controller.
//!
//! # Module Structure
//!
//! - `command_manager` - Core `CommandManager` with public API
//! - `controller` - Lifecycle controller (state machine per session)
//! - `multiplexer` - Concurrent stdout/stderr draining into the event queue
//! - `helpers` - Outcome arbitration and labels

mod command_manager;
pub mod controller;
mod helpers;
pub mod multiplexer;

pub use command_manager::{Attachment, CommandManager};
pub use controller::{INTERRUPTED_MESSAGE, LifecycleController};
pub use helpers::{SessionOutcome, decide_outcome};
pub use multiplexer::{DrainReport, MultiplexReport, Multiplexer};
