//! HTTP error mapping utilities

use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Longest response body excerpt kept in an error
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Failures of the outbound request or of reading its body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend refused the request (4xx), e.g. failed validation
    #[error("Backend rejected request with HTTP {status}: {message} [request_id: {request_id}]")]
    Rejected {
        status: u16,
        message: String,
        request_id: Uuid,
    },

    /// The backend failed (5xx)
    #[error("Backend error HTTP {status}: {message} [request_id: {request_id}]")]
    Server {
        status: u16,
        message: String,
        request_id: Uuid,
    },

    /// Any other status that is not 200
    #[error("Unexpected HTTP status {status} [request_id: {request_id}]")]
    UnexpectedStatus { status: u16, request_id: Uuid },

    #[error("Request timeout [request_id: {request_id}]")]
    Timeout { request_id: Uuid },

    #[error("Network error: {message} [request_id: {request_id}]")]
    Network { message: String, request_id: Uuid },

    #[error("Failed to build request: {message}")]
    Request { message: String },
}

impl TransportError {
    /// Status code carried by the error, if the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. }
            | Self::Server { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map a non-200 status and its body to a [`TransportError`]
pub fn map_http_error(status: StatusCode, body: Option<String>, request_id: Uuid) -> TransportError {
    let message = body
        .map(|b| excerpt(b.trim()))
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("no body").to_string());

    match status {
        status if status.is_client_error() => TransportError::Rejected {
            status: status.as_u16(),
            message,
            request_id,
        },
        status if status.is_server_error() => TransportError::Server {
            status: status.as_u16(),
            message,
            request_id,
        },
        status => TransportError::UnexpectedStatus {
            status: status.as_u16(),
            request_id,
        },
    }
}

/// Map a `reqwest` failure to a [`TransportError`]
pub fn map_reqwest_error(e: reqwest::Error, request_id: Uuid) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout { request_id }
    } else if e.is_builder() {
        TransportError::Request {
            message: e.to_string(),
        }
    } else if e.is_connect() {
        TransportError::Network {
            message: format!("Connection failed: {}", e),
            request_id,
        }
    } else {
        TransportError::Network {
            message: e.to_string(),
            request_id,
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", cut)
    }
}
