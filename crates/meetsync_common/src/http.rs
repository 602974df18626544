// --- File: crates/meetsync_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{HttpStatusCode, MeetSyncError};

pub mod client;

/// Builds the JSON error response used by every meetsync endpoint.
///
/// The body has the shape `{ "error": { "code": "...", "message": "..." } }`
/// where `code` is a stable machine readable identifier.
pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let body = Json(json!({
        "error": {
            "code": code,
            "message": message.into(),
        }
    }));
    (status, body).into_response()
}

impl IntoResponse for MeetSyncError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        }
        json_error(status, self.code(), self.to_string())
    }
}
