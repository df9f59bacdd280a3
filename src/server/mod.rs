//! HTTP surface
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /api/ai/command` | submit an AI command |
//! | `GET /api/ai/command/:id/stream` | WebSocket event stream with interrupt/ping |
//! | `GET /api/ai/command/:id/events` | SSE event stream |
//! | `GET /api/ai/command/:id/status` | stored record |
//! | `POST /api/ai/command/:id/interrupt` | out-of-band interrupt |
//! | `POST /api/agent/run` | submit a direct execution (when enabled) |
//! | `GET /api/agent/stream/:id` | SSE event stream |
//! | `POST /api/agent/interrupt/:id` | out-of-band interrupt |
//! | `GET /api/agent/status/:id` | stored record |
//! | `GET /api/sessions`, `GET /api/sessions/:id` | live session snapshots |

mod error;
mod handlers;
mod sse;
mod state;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::manager::CommandManager;
use crate::store::{CommandStore, FileStore, MemoryStore};

pub use error::{ApiError, ServerResult};
pub use state::AppState;
pub use ws::{WsReceiver, WsSender};

/// Build the router for `state`
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ai/command", post(handlers::submit_command))
        .route("/api/ai/command/:id/stream", get(ws::stream_command))
        .route("/api/ai/command/:id/events", get(sse::stream_events))
        .route("/api/ai/command/:id/status", get(handlers::command_status))
        .route("/api/ai/command/:id/interrupt", post(handlers::interrupt_command))
        .route("/api/agent/run", post(handlers::run_agent))
        .route("/api/agent/stream/:id", get(sse::stream_events))
        .route("/api/agent/interrupt/:id", post(handlers::interrupt_command))
        .route("/api/agent/status/:id", get(handlers::command_status))
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/sessions/:id", get(handlers::session_info))
        .layer(cors)
        .with_state(state)
}

/// Running server
pub struct ServerHandle {
    addr: SocketAddr,
    manager: Arc<CommandManager>,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Bound address
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Session manager behind the server
    #[must_use]
    pub fn manager(&self) -> &Arc<CommandManager> {
        &self.manager
    }

    /// Interrupt all sessions and stop accepting connections
    ///
    /// # Errors
    /// Returns error if the server task failed
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.manager.shutdown().await;
        self.shutdown.cancel();
        self.task.await.context("server task panicked")??;
        log::info!("Server on {} stopped", self.addr);
        Ok(())
    }

    /// Run until the server stops on its own
    ///
    /// # Errors
    /// Returns error if serving failed
    pub async fn wait(self) -> anyhow::Result<()> {
        self.task.await.context("server task panicked")??;
        Ok(())
    }
}

/// Bind `config.bind_addr` and start serving
///
/// Non-blocking: the server runs in a background task.
///
/// # Errors
/// Returns error if binding or opening the store fails
pub async fn start_server(config: ServerConfig) -> anyhow::Result<ServerHandle> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    start_server_with_listener(listener, config).await
}

/// Start serving on a pre-bound listener
///
/// `config.bind_addr` is ignored.
///
/// # Errors
/// Returns error if opening the store fails
pub async fn start_server_with_listener(
    listener: TcpListener,
    config: ServerConfig,
) -> anyhow::Result<ServerHandle> {
    let store: Arc<dyn CommandStore> = match &config.data_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let manager = Arc::new(CommandManager::new(store, config.manager.clone()));
    let state = AppState {
        manager: Arc::clone(&manager),
        duplex: config.duplex,
        push: config.push,
    };

    let addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();
    let app = router(state);
    let task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        })
    };

    log::info!("Command server listening on {addr}");
    log::info!(
        "Executable: {} | Workspace: {}",
        config.manager.executable,
        config.manager.workspace_dir.display()
    );

    Ok(ServerHandle {
        addr,
        manager,
        shutdown,
        task,
    })
}
