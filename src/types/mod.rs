//! Type definitions for command sessions
//!
//! - [`identifiers`] - `CommandId` newtype
//! - [`command`] - Submission requests, durable records, lifecycle status
//! - [`events`] - Progress events and their wire schema
//! - [`control`] - Inbound control messages on duplex connections
//! - [`session`] - Live session snapshots

pub mod command;
pub mod control;
pub mod events;
pub mod identifiers;
pub mod session;

pub use command::{
    Change, CommandContext, CommandRecord, CommandRequest, CommandResult, CommandScope,
    CommandStatus, ProcessRequest,
};
pub use control::ControlMessage;
pub use events::{
    Completion, ErrorData, EventKind, OutputLine, OutputStream, ProgressEvent, StatusData,
};
pub use identifiers::CommandId;
pub use session::SessionInfo;
