//! Command manager implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructor, sweep task and shutdown
//! - `submit`: Session creation for AI commands and direct executions
//! - `attach`: Taking a session's event stream and starting its controller
//! - `info`: Session snapshots and listing
//! - `interaction`: Interrupts and status queries

mod attach;
mod core;
mod info;
mod interaction;
mod submit;

pub use attach::Attachment;
pub use self::core::CommandManager;
