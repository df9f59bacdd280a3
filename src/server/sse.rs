//! Server-sent events (push-only) streaming

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use futures::Stream;
use tokio::sync::mpsc;

use crate::delivery::run_push;
use crate::types::{CommandId, ProgressEvent};

use super::error::ServerResult;
use super::state::AppState;

/// Events buffered between the adapter and the HTTP body
const SSE_BUFFER: usize = 16;

/// `GET /api/ai/command/:id/events` and `GET /api/agent/stream/:id`
pub async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let id = CommandId::parse(id)?;
    let attachment = state.manager.attach(&id)?;

    let (tx, mut rx) = mpsc::channel::<ProgressEvent>(SSE_BUFFER);
    let config = state.push;
    tokio::spawn(async move {
        let report = run_push(attachment, tx, config).await;
        log::info!(
            "[{id}] Event stream closed: {} events delivered, completed: {}",
            report.delivered,
            report.completed
        );
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => log::warn!("Failed to encode event: {e}"),
            }
        }
    };

    Ok(Sse::new(stream))
}
