//! REST handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{Value, json};

use crate::types::{CommandId, CommandRequest, ProcessRequest};

use super::error::ServerResult;
use super::state::AppState;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "sessions": state.manager.registry().len(),
    }))
}

/// `POST /api/ai/command`
pub async fn submit_command(
    State(state): State<AppState>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) = payload?;
    let id = state.manager.submit(request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Command received and queued for processing",
        "data": {
            "commandId": id,
            "status": "queued",
            "streamPath": format!("/api/ai/command/{id}/stream"),
            "eventsPath": format!("/api/ai/command/{id}/events"),
        }
    })))
}

/// `POST /api/agent/run`
pub async fn run_agent(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) = payload?;
    let id = state.manager.submit_process(request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Command queued",
        "data": {
            "commandId": id,
            "status": "queued",
            "streamPath": format!("/api/ai/command/{id}/stream"),
            "eventsPath": format!("/api/agent/stream/{id}"),
        }
    })))
}

/// `GET /api/ai/command/:id/status` and `GET /api/agent/status/:id`
pub async fn command_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = CommandId::parse(id)?;
    let record = state.manager.status(&id).await?;

    let mut data = json!({
        "commandId": record.id,
        "status": record.status,
        "prompt": record.prompt,
        "scope": record.scope,
        "createdAt": record.created_at,
        "completedAt": record.completed_at,
    });
    if let Some(result) = record.decoded_result() {
        data["result"] = result;
    }
    if let Some(error) = &record.error_message {
        data["error"] = json!(error);
    }

    Ok(Json(json!({ "success": true, "data": data })))
}

/// `POST /api/ai/command/:id/interrupt` and `POST /api/agent/interrupt/:id`
pub async fn interrupt_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = CommandId::parse(id)?;
    let outcome = state.manager.interrupt(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Interrupt processed",
        "data": {
            "commandId": id,
            "status": outcome.as_str(),
        }
    })))
}

/// `GET /api/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.manager.list_sessions();
    Json(json!({
        "success": true,
        "data": {
            "count": sessions.len(),
            "sessions": sessions,
        }
    }))
}

/// `GET /api/sessions/:id`
pub async fn session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = CommandId::parse(id)?;
    let info = state.manager.session_info(&id)?;
    Ok(Json(json!({ "success": true, "data": info })))
}

