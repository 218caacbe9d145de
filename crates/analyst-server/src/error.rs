//! Server error type and its HTTP mapping

use analyst_llm::LLMError;
use analyst_pipeline::{FetchError, PipelineError};
use analyst_utils::EnvError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Request body missing, malformed, or failing validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Startup configuration is incomplete or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    Llm(#[from] LLMError),

    #[error("Data service client error: {0}")]
    DataClient(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Config(_)
            | ServerError::Llm(_)
            | ServerError::DataClient(_)
            | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EnvError> for ServerError {
    fn from(err: EnvError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRequest(detail) => ServerError::InvalidRequest(detail),
            other => ServerError::Config(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
