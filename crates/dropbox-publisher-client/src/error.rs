//! Error types for the client library.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Error body returned by the Dropbox API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable summary such as `path/not_found/..`.
    pub error_summary: String,
}

/// Errors that can occur when talking to Dropbox.
///
/// Every variant has a stable name returned by [`ClientError::kind`], which
/// diagnostics use to identify the failure class.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    ///
    /// DNS resolution, refused connections, TLS failures and the like.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error, typically from the retry policy.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The access token is missing, invalid, expired or revoked (HTTP 401).
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// A remote path does not exist.
    #[error("Remote path not found: {0}")]
    PathNotFound(String),

    /// A remote path exists but is not a folder.
    #[error("Remote path is not a folder: {0}")]
    NotAFolder(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimitError {
        /// Suggested wait time before retrying, if provided by the API.
        retry_after: Option<Duration>,
    },

    /// The request took longer than the host's configured timeout.
    #[error("Timeout error")]
    TimeoutError,

    /// Dropbox is unavailable (5xx).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other API error.
    #[error("API error ({status}): {summary}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error summary from the response body, or the raw body.
        summary: String,
    },

    /// Client configuration issue such as an empty token or bad base URL.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The client was used after being disconnected.
    #[error("Client is disconnected")]
    Disconnected,
}

impl ClientError {
    /// Maps a transport failure, separating timeouts from other network errors.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError
        } else {
            Self::NetworkError(err)
        }
    }

    /// Maps a middleware failure, unwrapping transport errors it carries.
    #[must_use]
    pub fn from_middleware(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Self::from_transport(e),
            other => Self::MiddlewareError(other),
        }
    }

    /// Stable name of the error variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "NetworkError",
            Self::MiddlewareError(_) => "MiddlewareError",
            Self::SerializationError(_) => "SerializationError",
            Self::Io(_) => "IoError",
            Self::AuthenticationError(_) => "AuthenticationError",
            Self::PathNotFound(_) => "PathNotFound",
            Self::NotAFolder(_) => "NotAFolder",
            Self::RateLimitError { .. } => "RateLimitError",
            Self::TimeoutError => "TimeoutError",
            Self::ServiceUnavailable(_) => "ServiceUnavailable",
            Self::ApiError { .. } => "ApiError",
            Self::ConfigurationError(_) => "ConfigurationError",
            Self::Disconnected => "Disconnected",
        }
    }

    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ClientError::TimeoutError.kind(), "TimeoutError");
        assert_eq!(
            ClientError::AuthenticationError("expired".to_string()).kind(),
            "AuthenticationError"
        );
        assert_eq!(
            ClientError::ApiError {
                status: 400,
                summary: "bad".to_string()
            }
            .kind(),
            "ApiError"
        );
    }

    #[test]
    fn test_authentication_error() {
        assert!(ClientError::AuthenticationError("no".to_string()).is_authentication_error());
        assert!(!ClientError::TimeoutError.is_authentication_error());
    }

    #[test]
    fn test_error_response_parse() {
        let body = r#"{"error_summary": "path/not_found/..", "error": {".tag": "path"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or(ErrorResponse {
            error_summary: String::new(),
        });
        assert_eq!(parsed.error_summary, "path/not_found/..");
    }
}
