//! Model gateway error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while invoking a language model
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code:?}: {stderr}")]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Check if this error is worth retrying at the transport level
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::RateLimited { .. } => true,
            GatewayError::ApiError { status, .. } => *status >= 500 || *status == 408,
            GatewayError::Network(_) => true,
            GatewayError::Timeout(_) => true,
            GatewayError::Spawn { .. } => false,
            GatewayError::Exit { .. } => false,
            GatewayError::InvalidResponse(_) => false,
            GatewayError::Config(_) => false,
        }
    }
}
