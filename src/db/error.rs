//! Failure kinds reported by the vector store boundary.

use std::error::Error as _;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The service could not be reached (refused, timed out, DNS, ...)
    #[error("connection failed: {0}")]
    Connection(String),

    /// Credentials were rejected (HTTP 401/403)
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// The requested collection or resource does not exist (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// The service answered with a body that could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other non-success status
    #[error("service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// The client could not be built from the given host, port or credentials
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Short label for the failure kind, used as a structured log field.
    pub fn kind_label(&self) -> &'static str {
        match self {
            StoreError::Connection(_) => "connection",
            StoreError::Authentication(_) => "authentication",
            StoreError::NotFound(_) => "not_found",
            StoreError::MalformedResponse(_) => "malformed_response",
            StoreError::Service { .. } => "service",
            StoreError::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Classifies a non-success HTTP response.
    ///
    /// Chroma reports failures as `{"error": ..., "message": ...}`; the message is
    /// preferred, then the error name, then the raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.to_string()
            }
        });

        match status {
            401 | 403 => StoreError::Authentication(message),
            404 => StoreError::NotFound(message),
            _ => StoreError::Service { status, message },
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display omits the underlying cause, which is usually the useful part
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        if err.is_decode() {
            StoreError::MalformedResponse(message)
        } else if err.is_builder() {
            StoreError::InvalidConfig(message)
        } else {
            StoreError::Connection(message)
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            StoreError::from_status(401, ""),
            StoreError::Authentication(_)
        ));
        assert!(matches!(
            StoreError::from_status(403, "forbidden"),
            StoreError::Authentication(_)
        ));
        assert!(matches!(
            StoreError::from_status(404, ""),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from_status(500, ""),
            StoreError::Service { status: 500, .. }
        ));
    }

    #[test]
    fn test_message_prefers_json_message_field() {
        let body = r#"{"error":"NotFoundError","message":"Collection [docs] does not exist"}"#;
        let err = StoreError::from_status(404, body);
        assert_eq!(err.to_string(), "not found: Collection [docs] does not exist");
    }

    #[test]
    fn test_message_falls_back_to_error_field_then_body() {
        let err = StoreError::from_status(500, r#"{"error":"InternalError"}"#);
        assert_eq!(
            err.to_string(),
            "service error (HTTP 500): InternalError"
        );

        let err = StoreError::from_status(502, "  bad gateway \n");
        assert_eq!(err.to_string(), "service error (HTTP 502): bad gateway");

        let err = StoreError::from_status(503, "");
        assert_eq!(err.to_string(), "service error (HTTP 503): HTTP 503");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(StoreError::Connection("x".into()).kind_label(), "connection");
        assert_eq!(
            StoreError::MalformedResponse("x".into()).kind_label(),
            "malformed_response"
        );
        assert_eq!(
            StoreError::from_status(418, "").kind_label(),
            "service"
        );
    }
}
