//! WebSocket (duplex) streaming

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::delivery::{ControlReceiver, EventSender, run_duplex};
use crate::error::{CommandError, Result};
use crate::types::{CommandId, ControlMessage, ProgressEvent};

use super::error::ServerResult;
use super::state::AppState;

/// Outbound half of a WebSocket
pub struct WsSender(SplitSink<WebSocket, Message>);

impl EventSender for WsSender {
    async fn send(&mut self, event: &ProgressEvent) -> Result<()> {
        let text = event.to_json()?;
        self.0
            .send(Message::Text(text))
            .await
            .map_err(|e| CommandError::transport(e.to_string()))
    }
}

/// Inbound half of a WebSocket
pub struct WsReceiver(SplitStream<WebSocket>);

impl ControlReceiver for WsReceiver {
    async fn receive(&mut self) -> Option<ControlMessage> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => match ControlMessage::parse(&text) {
                    Some(message) => return Some(message),
                    None => log::debug!("Ignoring unknown control message: {text}"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => {
                    log::debug!("WebSocket receive failed: {e}");
                    return None;
                }
            }
        }
    }
}

/// `GET /api/ai/command/:id/stream`
pub async fn stream_command(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Response> {
    let id = CommandId::parse(id)?;
    if state.manager.registry().lookup(&id).is_none() {
        return Err(CommandError::session_not_found(id.as_str()).into());
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, id: CommandId) {
    let (sink, stream) = socket.split();
    let mut sender = WsSender(sink);

    let attachment = match state.manager.attach(&id) {
        Ok(attachment) => attachment,
        Err(e) => {
            log::warn!("[{id}] WebSocket attach failed: {e}");
            if let Err(e) = sender.send(&ProgressEvent::error(e.to_string())).await {
                log::debug!("[{id}] Failed to send attach error: {e}");
            }
            if let Err(e) = sender.0.send(Message::Close(None)).await {
                log::debug!("[{id}] Failed to close WebSocket: {e}");
            }
            return;
        }
    };

    let report = run_duplex(attachment, sender, WsReceiver(stream), state.duplex).await;
    log::info!(
        "[{id}] WebSocket closed: {} events delivered, completed: {}",
        report.delivered,
        report.completed
    );
}
