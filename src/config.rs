//! Configuration for the command manager, delivery adapters and server
//!
//! All values have defaults; [`ServerConfig::from_env`] overlays environment
//! variables for the binary.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CommandError, Result};

/// Default external executable for AI commands
pub const DEFAULT_EXECUTABLE: &str = "claude";

/// Default working directory for launched processes
pub const DEFAULT_WORKSPACE_DIR: &str = "/workspace/code";

/// Default event queue capacity per session
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Keep-alive interval for duplex (WebSocket) connections
pub const DUPLEX_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Keep-alive interval for push-only (SSE) connections
pub const PUSH_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// How long a session may wait for its first client (10 minutes)
const QUEUED_SESSION_TTL: Duration = Duration::from_secs(600);

/// Interval of the abandoned-session sweep (1 minute)
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";

// ============================================================================
// Manager
// ============================================================================

/// Configuration for [`crate::CommandManager`]
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Executable run for AI commands
    pub executable: String,
    /// Arguments placed before the prompt
    pub executable_args: Vec<String>,
    /// Working directory for launched processes
    pub workspace_dir: PathBuf,
    /// Bounded event queue capacity per session
    pub queue_capacity: usize,
    /// Sessions never attached within this window are abandoned
    pub queued_session_ttl: Duration,
    /// How often the abandoned-session sweep runs
    pub sweep_interval: Duration,
    /// Whether arbitrary executables may be submitted
    pub allow_custom_commands: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            executable_args: Vec::new(),
            workspace_dir: PathBuf::from(DEFAULT_WORKSPACE_DIR),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queued_session_ttl: QUEUED_SESSION_TTL,
            sweep_interval: SWEEP_INTERVAL,
            allow_custom_commands: false,
        }
    }
}

impl ManagerConfig {
    /// Set the AI command executable
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Set arguments placed before the prompt
    #[must_use]
    pub fn with_executable_args(mut self, args: Vec<String>) -> Self {
        self.executable_args = args;
        self
    }

    /// Set the working directory for launched processes
    #[must_use]
    pub fn with_workspace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_dir = dir.into();
        self
    }

    /// Set the per-session queue capacity (minimum 1)
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set how long a session may wait for its first client
    #[must_use]
    pub fn with_queued_session_ttl(mut self, ttl: Duration) -> Self {
        self.queued_session_ttl = ttl;
        self
    }

    /// Set the sweep interval
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Allow or forbid arbitrary executables
    #[must_use]
    pub fn with_custom_commands(mut self, allow: bool) -> Self {
        self.allow_custom_commands = allow;
        self
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Configuration for one delivery adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Idle time after which a keep-alive `ping` is sent
    pub keep_alive: Duration,
}

impl DeliveryConfig {
    /// Defaults for duplex connections
    #[must_use]
    pub fn duplex() -> Self {
        Self {
            keep_alive: DUPLEX_KEEP_ALIVE,
        }
    }

    /// Defaults for push-only connections
    #[must_use]
    pub fn push() -> Self {
        Self {
            keep_alive: PUSH_KEEP_ALIVE,
        }
    }

    /// Override the keep-alive interval
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

// ============================================================================
// Server
// ============================================================================

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Directory of the file-backed command store; in-memory when `None`
    pub data_dir: Option<PathBuf>,
    /// Command manager settings
    pub manager: ManagerConfig,
    /// WebSocket delivery settings
    pub duplex: DeliveryConfig,
    /// SSE delivery settings
    pub push: DeliveryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            data_dir: None,
            manager: ManagerConfig::default(),
            duplex: DeliveryConfig::duplex(),
            push: DeliveryConfig::push(),
        }
    }
}

impl ServerConfig {
    /// Build configuration from environment variables
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `COMMAND_BIND_ADDR` | listen address, default `0.0.0.0:9000` |
    /// | `COMMAND_DATA_DIR` | enables the file-backed store |
    /// | `COMMAND_EXECUTABLE` | AI command executable, default `claude` |
    /// | `COMMAND_EXECUTABLE_ARGS` | whitespace-separated leading arguments |
    /// | `CLAUDE_WORKSPACE_DIR` | working directory, default `/workspace/code` |
    /// | `COMMAND_ALLOW_CUSTOM` | `1`/`true` enables `/api/agent/run` |
    /// | `COMMAND_QUEUE_CAPACITY` | per-session queue capacity |
    ///
    /// # Errors
    /// Returns `InvalidRequest` when a variable cannot be parsed
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        let bind = env_var("COMMAND_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        config.bind_addr = bind.parse().map_err(|e| {
            CommandError::invalid_request(format!("COMMAND_BIND_ADDR '{bind}': {e}"))
        })?;

        config.data_dir = env_var("COMMAND_DATA_DIR").map(PathBuf::from);

        if let Some(executable) = env_var("COMMAND_EXECUTABLE") {
            config.manager.executable = executable;
        }
        if let Some(args) = env_var("COMMAND_EXECUTABLE_ARGS") {
            config.manager.executable_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = env_var("CLAUDE_WORKSPACE_DIR") {
            config.manager.workspace_dir = PathBuf::from(dir);
        }
        if let Some(allow) = env_var("COMMAND_ALLOW_CUSTOM") {
            config.manager.allow_custom_commands = matches!(allow.as_str(), "1" | "true" | "yes");
        }
        if let Some(capacity) = env_var("COMMAND_QUEUE_CAPACITY") {
            let capacity: usize = capacity.parse().map_err(|e| {
                CommandError::invalid_request(format!("COMMAND_QUEUE_CAPACITY '{capacity}': {e}"))
            })?;
            config.manager.queue_capacity = capacity.max(1);
        }

        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
