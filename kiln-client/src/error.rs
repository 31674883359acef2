//! Error types for the Kiln clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while talking to the Kiln server or the GitHub API
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Remote answered with a non-success status code
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(ClientError::api_error(404, "Build 3 not found").is_not_found());
        assert!(!ClientError::api_error(500, "boom").is_not_found());
        assert!(!ClientError::ParseError("bad".into()).is_not_found());
    }
}
