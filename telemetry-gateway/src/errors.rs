use crate::config::ValidationError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that can occur while serving or relaying telemetry
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Failed to read response body from {0}: {1}")]
    ResponseBodyError(String, String),

    #[error("Upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("Upstream {0} returned status {1}")]
    UpstreamStatus(String, StatusCode),

    #[error("Upstream timeout for {0}")]
    UpstreamTimeout(String),

    #[error("Failed to load predictions from {0}: {1}")]
    PredictionsError(String, String),

    #[error("Aggregation failed: {0}")]
    AggregationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// True for failures of an outbound call: connection, timeout, status, or body.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            GatewayError::UpstreamRequestFailed(..)
                | GatewayError::UpstreamStatus(..)
                | GatewayError::UpstreamTimeout(_)
                | GatewayError::ResponseBodyError(..)
        )
    }
}
