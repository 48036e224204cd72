use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diun_tracker_lib::PayloadError;
use thiserror::Error;
use tracing::{error, warn};

use super::store::StoreError;

/// Failures a handler can return. Every variant renders as
/// `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] PayloadError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "rejected request");
        }
        (
            status,
            Json(serde_json::json!({"error": self.to_string()})),
        )
            .into_response()
    }
}
