//! # Streaming command sessions
//!
//! Accepts a natural-language command, hands it to a long-running external
//! executable and streams the executable's progress to one connected client
//! in real time, with mid-flight interruption.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kodegen_ai_command::{CommandManager, CommandRequest, ManagerConfig, MemoryStore};
//!
//! # async fn example() -> kodegen_ai_command::Result<()> {
//! let manager = CommandManager::new(Arc::new(MemoryStore::new()), ManagerConfig::default());
//!
//! let id = manager
//!     .submit(CommandRequest {
//!         prompt: "Add a contact form".to_string(),
//!         scope: "current-page".to_string(),
//!         context: Default::default(),
//!     })
//!     .await?;
//!
//! let mut attachment = manager.attach(&id)?;
//! while let Some(event) = attachment.next_event().await {
//!     println!("{}", event.to_json()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`launcher`]: starts the executable, exposes both output pipes and an
//!   exit handle that kills the process on cancellation
//! - [`manager`]: the output multiplexer, the per-session lifecycle
//!   controller and [`CommandManager`], the composition root
//! - [`session`]: per-session state and the bounded event queue
//! - [`registry`]: the process-wide map of live sessions
//! - [`delivery`]: pumps events to a duplex or push-only connection
//! - [`store`]: durable command records
//! - [`server`]: axum routes for REST, WebSocket and SSE
//!
//! Events flow from the multiplexer through the session queue and the
//! delivery adapter to the client; an interrupt flows back from the client
//! through the session's cancellation token to the launcher and controller.
//!
//! Every session ends with exactly one `complete` event. On success it is
//! preceded by one `result` event, on failure by an `error` event, and on
//! interruption by a status message.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod delivery;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

pub use config::{DeliveryConfig, ManagerConfig, ServerConfig};
pub use delivery::{ControlReceiver, DeliveryReport, EventSender, run_duplex, run_push};
pub use error::{CommandError, LaunchError, Result};
pub use launcher::{LaunchSpec, ProcessExit, launch};
pub use manager::{Attachment, CommandManager, SessionOutcome, decide_outcome};
pub use registry::SessionRegistry;
pub use server::{ServerHandle, router, start_server, start_server_with_listener};
pub use session::{InterruptOutcome, Session};
pub use store::{CommandStore, FileStore, MemoryStore};
pub use types::{
    CommandId, CommandRecord, CommandRequest, CommandResult, CommandScope, CommandStatus,
    ControlMessage, EventKind, OutputStream, ProcessRequest, ProgressEvent, SessionInfo,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
