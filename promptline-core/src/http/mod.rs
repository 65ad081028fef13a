//! HTTP transport for streaming chat requests
//!
//! This module implements the network side of Promptline, handling:
//! - Connection pooling and client management
//! - Endpoint selection per backend mode
//! - Status and transport error mapping
//! - Request ID generation and correlation

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::{map_http_error, TransportError};

use crate::protocol::{BackendMode, ChatPayload};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;
use uuid::Uuid;

/// Response body as a stream of raw chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Options for one outbound request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Whole-request timeout; `None` leaves the stream unbounded
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reuse an existing request ID
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Sends a chat payload to a backend and hands back the streaming body
///
/// Implementations must return an error for any status other than 200, before
/// any of the body is read.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(
        &self,
        mode: BackendMode,
        payload: &ChatPayload,
        options: RequestOptions,
    ) -> Result<ByteStream, TransportError>;
}
