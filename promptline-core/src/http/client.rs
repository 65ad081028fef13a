//! HTTP client implementation using reqwest

use crate::config::{ConnectionConfig, EndpointConfig};
use crate::http::error::{map_http_error, map_reqwest_error};
use crate::http::{ByteStream, ChatTransport, RequestOptions, TransportError};
use crate::protocol::{BackendMode, ChatPayload};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default user agent
const USER_AGENT: &str = concat!("promptline/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Where each backend mode is reached
    endpoints: EndpointConfig,

    /// Timeout applied when the request options carry none
    default_timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::from_config(&ConnectionConfig::default(), EndpointConfig::default())
    }

    /// Create a new HTTP client from connection and endpoint configuration
    ///
    /// No overall timeout is installed on the pooled client: a streamed answer
    /// may legitimately take minutes. Set `request_timeout_ms` to bound it.
    pub fn from_config(
        connection: &ConnectionConfig,
        endpoints: EndpointConfig,
    ) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(connection.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(connection.keepalive_secs))
            .connect_timeout(connection.connect_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Request {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client: Arc::new(client),
            endpoints,
            default_timeout: connection.request_timeout(),
        })
    }

    /// URL targeted for a backend mode
    pub fn endpoint(&self, mode: BackendMode) -> &str {
        self.endpoints.for_mode(mode)
    }
}

#[async_trait]
impl ChatTransport for HttpClient {
    async fn open_stream(
        &self,
        mode: BackendMode,
        payload: &ChatPayload,
        options: RequestOptions,
    ) -> Result<ByteStream, TransportError> {
        let request_id = options.request_id;
        let url = self.endpoint(mode);

        info!(
            "Sending {} request to {} backend [request_id: {}]",
            payload.current_model, mode, request_id
        );
        debug!("Request URL: {}", url);

        let mut req_builder = self
            .client
            .post(url)
            .json(payload)
            .header("X-Request-ID", request_id.to_string());

        if let Some(timeout) = options.timeout.or(self.default_timeout) {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Request timeout for {} backend [request_id: {}]", mode, request_id);
            } else {
                error!("Request error for {} backend [request_id: {}]: {}", mode, request_id, e);
            }
            map_reqwest_error(e, request_id)
        })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if status != StatusCode::OK {
            let body = response.text().await.ok();
            warn!(
                "Request failed with status {} for {} backend [request_id: {}]",
                status, mode, request_id
            );
            return Err(map_http_error(status, body, request_id));
        }

        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_reqwest_error(e, request_id)));
        Ok(stream.boxed())
    }
}
