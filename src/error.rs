use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Rate limited by storage network: {0}")]
    RateLimited(String),

    /// Non-2xx other than 404/429. `status` is `None` for transport failures
    /// (connection refused, reset, DNS) where no response arrived.
    #[error("Upstream error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid content identifier: {0}")]
    InvalidIdentifier(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest does not report the configured deadline
            return StorageError::Timeout(Duration::ZERO);
        }
        StorageError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl StorageError {
    /// Classify a non-success gateway response.
    pub fn from_status(status: StatusCode, subject: &str, body: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => StorageError::NotFound(subject.to_string()),
            StatusCode::TOO_MANY_REQUESTS => {
                StorageError::RateLimited(format!("gateway returned 429 for {}", subject))
            }
            _ => {
                let detail = body.trim();
                let message = if detail.is_empty() {
                    format!("request for {} failed", subject)
                } else {
                    format!("request for {} failed: {}", subject, truncate(detail, 200))
                };
                StorageError::Upstream {
                    status: Some(status.as_u16()),
                    message,
                }
            }
        }
    }

    /// Whether a retry may succeed where this attempt failed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::RateLimited(_) | StorageError::Timeout(_) => true,
            StorageError::Upstream { status, .. } => match status {
                None => true,
                Some(code) => *code >= 500,
            },
            StorageError::NotFound(_)
            | StorageError::Parse(_)
            | StorageError::Config(_)
            | StorageError::InvalidIdentifier(_)
            | StorageError::Io(_)
            | StorageError::Internal(_) => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            StorageError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            StorageError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            StorageError::Parse(_) => StatusCode::BAD_GATEWAY,
            StorageError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StorageError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StorageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "content_not_found",
            StorageError::RateLimited(_) => "rate_limited",
            StorageError::Upstream { .. } => "upstream_error",
            StorageError::Timeout(_) => "timeout",
            StorageError::Parse(_) => "parse_error",
            StorageError::Config(_) => "config_error",
            StorageError::InvalidIdentifier(_) => "invalid_identifier",
            StorageError::Io(_) => "io_error",
            StorageError::Internal(_) => "internal_error",
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub request_id: String,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
            request_id: format!("req_sv_{}", uuid::Uuid::new_v4()),
        };

        let mut response = (self.status_code(), Json(error_response)).into_response();
        if matches!(&self, StorageError::RateLimited(_)) {
            response.headers_mut().insert(
                http::header::RETRY_AFTER,
                http::HeaderValue::from_static("1"),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            StorageError::from_status(StatusCode::NOT_FOUND, "bafy1", ""),
            StorageError::NotFound(ref id) if id == "bafy1"
        ));
        assert!(matches!(
            StorageError::from_status(StatusCode::TOO_MANY_REQUESTS, "bafy1", ""),
            StorageError::RateLimited(_)
        ));
        assert!(matches!(
            StorageError::from_status(StatusCode::BAD_GATEWAY, "bafy1", "oops"),
            StorageError::Upstream {
                status: Some(502),
                ..
            }
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::RateLimited("x".into()).is_transient());
        assert!(StorageError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(StorageError::Upstream {
            status: Some(503),
            message: "x".into()
        }
        .is_transient());
        assert!(StorageError::Upstream {
            status: None,
            message: "connection refused".into()
        }
        .is_transient());

        assert!(!StorageError::Upstream {
            status: Some(400),
            message: "x".into()
        }
        .is_transient());
        assert!(!StorageError::NotFound("x".into()).is_transient());
        assert!(!StorageError::Parse("x".into()).is_transient());
        assert!(!StorageError::Config("x".into()).is_transient());
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let e = StorageError::Upstream {
            status: Some(500),
            message: "boom".into(),
        };
        assert_eq!(e.to_string(), "Upstream error (HTTP 500): boom");

        let e = StorageError::Upstream {
            status: None,
            message: "refused".into(),
        };
        assert_eq!(e.to_string(), "Upstream error: refused");
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(1000);
        match StorageError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "id", &body) {
            StorageError::Upstream { message, .. } => assert!(message.len() < 300),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(feature = "axum-support")]
    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = StorageError::RateLimited("slow down".into()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(http::header::RETRY_AFTER));
    }
}
