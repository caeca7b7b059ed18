//! Error taxonomy for DSA Recall backend requests.
//!
//! Non-2xx responses from the backend carry either a JSON object with an
//! `error` string field or a plain-text body. [`ApiError::from_response`]
//! normalizes both into a human-readable message: JSON `error` field first,
//! then the raw body text, then a generic fallback when both are empty.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Fallback when an error body is JSON but carries no usable `error` field.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

/// Fallback when an error body is empty or unreadable.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// JSON error envelope returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: String,
}

/// Errors surfaced by the backend client.
///
/// Messages inside `AuthRejected` and `ValidationRejected` come verbatim from
/// the backend and are shown to the user as-is. `Unreachable` substitutes a
/// generic message since transport errors are not user-actionable.
/// `NotAuthenticated` is a normal state, not something to put in an error
/// banner.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the credentials or session (401/403).
    #[error("{0}")]
    AuthRejected(String),

    /// The backend rejected the submitted data (other 4xx).
    #[error("{0}")]
    ValidationRejected(String),

    /// The backend failed on its side (5xx), or returned a payload the
    /// client could not decode.
    #[error("{0}")]
    Backend(String),

    /// The backend could not be reached at all.
    #[error("Unable to reach the DSA Recall server. Is it running?")]
    Unreachable(#[source] reqwest::Error),

    /// No session is established.
    #[error("Not logged in")]
    NotAuthenticated,
}

impl ApiError {
    /// Build an error from a non-2xx status and its raw body text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = normalize_message(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::AuthRejected(message),
            s if s.is_client_error() => ApiError::ValidationRejected(message),
            _ => ApiError::Backend(message),
        }
    }

    /// True for the expected "no session" state.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, ApiError::NotAuthenticated)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            tracing::warn!(error = %err, "Failed to decode backend response");
            return ApiError::Backend(UNEXPECTED_ERROR.to_string());
        }
        ApiError::Unreachable(err)
    }
}

/// Extract a displayable message from an error body.
///
/// Mirrors what the backend promises: try JSON `{"error": "..."}` first, fall
/// back to the raw text, fall back to a generic message.
fn normalize_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.is_empty() => envelope.error,
        Ok(_) => UNEXPECTED_ERROR.to_string(),
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_field_is_forwarded_verbatim() {
        let err = ApiError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"invalid credentials"}"#,
        );
        assert!(matches!(err, ApiError::AuthRejected(ref m) if m == "invalid credentials"));
    }

    #[test]
    fn test_json_without_error_field_falls_back_to_generic() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"detail":"nope"}"#);
        assert!(matches!(err, ApiError::ValidationRejected(ref m) if m == UNEXPECTED_ERROR));
    }

    #[test]
    fn test_plain_text_body_is_used_as_is() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, "Title is required\n");
        assert!(matches!(err, ApiError::ValidationRejected(ref m) if m == "Title is required"));
    }

    #[test]
    fn test_empty_body_falls_back_to_generic() {
        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(err, ApiError::Backend(ref m) if m == UNKNOWN_ERROR));
    }

    #[test]
    fn test_forbidden_maps_to_auth_rejected() {
        let err = ApiError::from_response(StatusCode::FORBIDDEN, r#"{"error":"not yours"}"#);
        assert!(matches!(err, ApiError::AuthRejected(ref m) if m == "not yours"));
    }

    #[test]
    fn test_unprocessable_maps_to_validation_rejected() {
        let err = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error":"Link must be a URL"}"#,
        );
        assert!(matches!(err, ApiError::ValidationRejected(_)));
    }

    #[test]
    fn test_server_error_maps_to_backend() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "upstream died");
        assert!(matches!(err, ApiError::Backend(ref m) if m == "upstream died"));
    }

    #[test]
    fn test_display_is_the_message() {
        let err = ApiError::AuthRejected("invalid credentials".to_string());
        assert_eq!(err.to_string(), "invalid credentials");
    }
}
