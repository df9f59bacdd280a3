//! Process launcher
//!
//! Starts an external executable with piped output streams and hands back an
//! [`ExitHandle`] that force-terminates the process when the session's
//! cancellation token fires.
//!
//! # Module Structure
//!
//! - `config` - Environment deny-list and the command id variable
//! - `command` - `LaunchSpec` and the AI command builder
//! - `lifecycle` - `launch`, `ExitHandle`, `ProcessExit`

mod command;
mod config;
mod lifecycle;

pub use command::{AiCommandBuilder, LaunchSpec, build_prompt};
pub use config::{COMMAND_ID_ENV, DANGEROUS_ENV_VARS};
pub use lifecycle::{ExitHandle, ExitOutcome, LaunchedProcess, ProcessExit, launch};
