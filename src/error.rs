use thiserror::Error;

/// Reasons an incoming webhook body is rejected before it touches the store.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("webhook payload must be a JSON object")]
    NotAnObject,
}
