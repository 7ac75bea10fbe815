//! API error taxonomy
//!
//! Every failure is turned into a display-ready message. HTTP failures are
//! classified by status, content type and the `grpc-message` header, and
//! prefixed with a short summary of the operation that failed.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by requests, subscriptions and resource bindings.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, body read).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// HTTP 403. Server detail is discarded on purpose.
    #[error("You do not have permission to '{summary}', contact system admin")]
    PermissionDenied { summary: String },

    /// HTTP 405.
    #[error("{summary}: method is not allowed")]
    MethodNotAllowed { summary: String },

    /// Non-success status with a JSON `message` or a `grpc-message` header.
    #[error("{summary}: {message}")]
    Api {
        summary: String,
        status: u16,
        message: String,
    },

    /// Non-success status with a body that is not structured JSON.
    #[error("{summary}: {body}")]
    Unstructured {
        summary: String,
        status: u16,
        body: String,
    },

    /// Event stream refused with 403.
    #[error("permission denied")]
    StreamPermissionDenied,

    /// Event stream refused with any other status; carries the status text.
    #[error("{text}")]
    StreamStatus { status: u16, text: String },

    /// Event stream ended. Streams are not reconnected.
    #[error("event stream closed")]
    StreamClosed,

    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("missing '{0}' for resource path")]
    MissingParameter(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Classify a failed response, consuming its body.
    pub async fn from_response(summary: &str, response: reqwest::Response) -> Self {
        let status = response.status();
        let content_type = header_str(&response, reqwest::header::CONTENT_TYPE);
        let grpc_message = header_str(&response, "grpc-message");

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Self::Transport(e),
        };

        Self::classify(
            summary,
            status,
            content_type.as_deref(),
            grpc_message.as_deref(),
            &body,
        )
    }

    /// Classify a failure from its parts.
    pub fn classify(
        summary: &str,
        status: StatusCode,
        content_type: Option<&str>,
        grpc_message: Option<&str>,
        body: &str,
    ) -> Self {
        let summary = summary.to_string();

        if status == StatusCode::METHOD_NOT_ALLOWED {
            return Self::MethodNotAllowed { summary };
        }
        if status == StatusCode::FORBIDDEN {
            return Self::PermissionDenied { summary };
        }

        let is_json = content_type
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        if is_json {
            if let Some(message) = grpc_message {
                return Self::Api {
                    summary,
                    status: status.as_u16(),
                    message: message.to_string(),
                };
            }

            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|json| json.get("message").and_then(|m| m.as_str()).map(String::from));
            if let Some(message) = message {
                return Self::Api {
                    summary,
                    status: status.as_u16(),
                    message,
                };
            }
        }

        Self::Unstructured {
            summary,
            status: status.as_u16(),
            body: body.to_string(),
        }
    }

    /// Classify a refused event stream.
    pub fn from_stream_status(status: StatusCode) -> Self {
        if status == StatusCode::FORBIDDEN {
            return Self::StreamPermissionDenied;
        }
        Self::StreamStatus {
            status: status.as_u16(),
            text: status
                .canonical_reason()
                .map(String::from)
                .unwrap_or_else(|| status.as_str().to_string()),
        }
    }

    /// HTTP status behind this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied { .. } | Self::StreamPermissionDenied => Some(403),
            Self::MethodNotAllowed { .. } => Some(405),
            Self::Api { status, .. }
            | Self::Unstructured { status, .. }
            | Self::StreamStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn header_str(response: &reqwest::Response, name: impl reqwest::header::AsHeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
