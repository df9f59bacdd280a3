//! HTTP error responses

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::CommandError;

/// Handler result type
pub type ServerResult<T> = Result<T, ApiError>;

/// A [`CommandError`] rendered as `{ success: false, error: { code, message, details? } }`
#[derive(Debug)]
pub struct ApiError(pub CommandError);

impl ApiError {
    /// HTTP status for the wrapped error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            CommandError::MissingPrompt
            | CommandError::InvalidScope(_)
            | CommandError::InvalidRequest(_)
            | CommandError::InvalidCommandId(_)
            | CommandError::Json(_) => StatusCode::BAD_REQUEST,
            CommandError::SessionNotFound(_) | CommandError::CommandNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CommandError::AlreadyAttached(_) | CommandError::DuplicateSession(_) => {
                StatusCode::CONFLICT
            }
            CommandError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match &self.0 {
            CommandError::InvalidScope(_) => {
                Some("Scope must be one of: current-page, new-page, global".to_string())
            }
            CommandError::InvalidRequest(detail) => Some(detail.clone()),
            CommandError::Json(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(error: CommandError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CommandError::invalid_request(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }

        let mut error = json!({
            "code": self.0.code(),
            "message": self.0.to_string(),
        });
        if let Some(details) = self.details() {
            error["details"] = json!(details);
        }

        (status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}
