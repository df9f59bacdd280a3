//! Shared handler state

use std::sync::Arc;

use crate::config::DeliveryConfig;
use crate::manager::CommandManager;

/// State cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// Session manager
    pub manager: Arc<CommandManager>,
    /// WebSocket delivery settings
    pub duplex: DeliveryConfig,
    /// SSE delivery settings
    pub push: DeliveryConfig,
}
