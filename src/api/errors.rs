//! API client errors.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or an undecodable body.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the request with a readable message.
    #[error("{message}")]
    Server {
        /// Response status.
        status: StatusCode,

        /// Message from the response body, verbatim.
        message: String,
    },

    /// The server returned a non-2xx response without a readable message.
    #[error("unexpected response with status {status}: {body}")]
    UnexpectedResponse {
        /// Response status.
        status: StatusCode,

        /// Raw response body.
        body: String,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Build an error from a non-2xx response body.
    pub(crate) fn from_response(status: StatusCode, body: String) -> Self {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.message.or(parsed.error))
            .filter(|message| !message.trim().is_empty());

        match message {
            Some(message) => Self::Server { status, message },
            None => Self::UnexpectedResponse { status, body },
        }
    }

    /// The server's own message, when it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The response status, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(error) => error.status(),
            Self::Server { status, .. } | Self::UnexpectedResponse { status, .. } => Some(*status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_is_surfaced() {
        let error = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"Voucher has reached its usage limit"}"#.to_string(),
        );

        assert_eq!(error.server_message(), Some("Voucher has reached its usage limit"));
        assert_eq!(error.to_string(), "Voucher has reached its usage limit");
    }

    #[test]
    fn error_field_is_fallback() {
        let error =
            ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"error":"Out of stock"}"#.to_string());

        assert_eq!(error.server_message(), Some("Out of stock"));
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn unreadable_body_is_unexpected() {
        let error = ApiError::from_response(StatusCode::BAD_GATEWAY, "<html>".to_string());

        assert!(error.server_message().is_none());
        assert!(matches!(error, ApiError::UnexpectedResponse { .. }));
    }
}
