//! HTTP error mapping
//!
//! Error bodies are plain text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use crate::session::SubmitError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to classify tasks")]
    Upstream,

    #[error("Task store unavailable")]
    Store(#[from] StoreError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Upstream | ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SubmitError> for ServerError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::EmptyInput => ServerError::BadRequest(err.to_string()),
            SubmitError::Busy => ServerError::Conflict(err.to_string()),
            SubmitError::Store(e) => ServerError::Store(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, %status, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_errors_map_to_status() {
        assert_eq!(ServerError::from(SubmitError::EmptyInput).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::from(SubmitError::Busy).status(), StatusCode::CONFLICT);
        assert_eq!(
            ServerError::from(SubmitError::Store(StoreError::ChannelError)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(ServerError::Upstream.to_string(), "Failed to classify tasks");
        assert_eq!(ServerError::from(SubmitError::EmptyInput).to_string(), "Text is required");
    }
}
