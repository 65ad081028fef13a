//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use crate::protocol::{BackendMode, Provider, MAX_INPUT_LENGTH};
use crate::stream::{ConsumerOptions, DEFAULT_MAX_LINE_BYTES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Schema version understood by this build
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure for Promptline
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptlineConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Backend endpoints per framing convention
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Connection settings for the HTTP client
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Stream decoding settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Form defaults
    #[serde(default)]
    pub defaults: DefaultConfig,
}

impl Default for PromptlineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            endpoints: EndpointConfig::default(),
            connection: ConnectionConfig::default(),
            stream: StreamConfig::default(),
            defaults: DefaultConfig::default(),
        }
    }
}

/// Backend endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Endpoint streaming `0:"..."` prefixed frames
    #[serde(default = "default_prefixed_endpoint")]
    pub prefixed: String,

    /// Endpoint streaming raw text
    #[serde(default = "default_raw_endpoint")]
    pub raw: String,
}

impl EndpointConfig {
    /// URL targeted for a backend mode
    pub fn for_mode(&self, mode: BackendMode) -> &str {
        match mode {
            BackendMode::NextJs => &self.prefixed,
            BackendMode::Python => &self.raw,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            prefixed: default_prefixed_endpoint(),
            raw: default_raw_endpoint(),
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout in milliseconds; unset means no limit
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: None,
            max_idle_per_host: default_max_idle(),
            keepalive_secs: default_keepalive(),
        }
    }
}

/// Stream decoding configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Interpret a final line that has no trailing newline
    #[serde(default)]
    pub flush_trailing_line: bool,

    /// Largest undelimited line accepted before the stream fails
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl StreamConfig {
    pub fn consumer_options(&self) -> ConsumerOptions {
        ConsumerOptions {
            flush_trailing_line: self.flush_trailing_line,
            max_line_bytes: Some(self.max_line_bytes),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            flush_trailing_line: false,
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

/// Default form values
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultConfig {
    /// Backend selected when the form opens
    #[serde(default)]
    pub backend: BackendMode,

    /// Provider selected when the form opens
    #[serde(default)]
    pub provider: Provider,

    /// Longest system prompt or user input accepted locally
    #[serde(default = "default_max_input_length")]
    pub max_input_length: usize,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::default(),
            provider: Provider::default(),
            max_input_length: default_max_input_length(),
        }
    }
}

// Default value functions for serde
fn default_prefixed_endpoint() -> String { "http://localhost:3000/api/chat".to_string() }
fn default_raw_endpoint() -> String { "http://127.0.0.1:5000/".to_string() }
fn default_connect_timeout() -> u64 { 10000 }
fn default_max_idle() -> usize { 10 }
fn default_keepalive() -> u64 { 90 }
fn default_max_line_bytes() -> usize { DEFAULT_MAX_LINE_BYTES }
fn default_max_input_length() -> usize { MAX_INPUT_LENGTH }

impl PromptlineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    found: self.version.clone(),
                    expected: CONFIG_VERSION,
                },
            ));
        }

        validate_url("endpoints.prefixed", &self.endpoints.prefixed)?;
        validate_url("endpoints.raw", &self.endpoints.raw)?;

        self.connection.validate("connection")?;
        self.stream.validate("stream")?;

        if self.defaults.max_input_length == 0 {
            return Err(ValidationError::new(
                "defaults.max_input_length",
                ValidationErrorKind::Zero,
            ));
        }

        Ok(())
    }
}

impl ConnectionConfig {
    /// Validate connection settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::new(
                format!("{}.connect_timeout_ms", path),
                ValidationErrorKind::Zero,
            ));
        }

        match self.request_timeout_ms {
            Some(0) => Err(ValidationError::new(
                format!("{}.request_timeout_ms", path),
                ValidationErrorKind::Zero,
            )),
            Some(request_ms) if request_ms < self.connect_timeout_ms => Err(ValidationError::new(
                format!("{}.request_timeout_ms", path),
                ValidationErrorKind::TimeoutBelowConnect {
                    request_ms,
                    connect_ms: self.connect_timeout_ms,
                },
            )),
            _ => Ok(()),
        }
    }
}

impl StreamConfig {
    /// Validate stream settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_line_bytes == 0 {
            return Err(ValidationError::new(
                format!("{}.max_line_bytes", path),
                ValidationErrorKind::Zero,
            ));
        }
        Ok(())
    }
}

fn validate_url(path: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(path, ValidationErrorKind::EmptyEndpoint));
    }

    let url = url::Url::parse(value).map_err(|e| {
        ValidationError::new(
            path,
            ValidationErrorKind::MalformedEndpoint {
                reason: e.to_string(),
            },
        )
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ValidationError::new(
            path,
            ValidationErrorKind::UnsupportedScheme {
                scheme: scheme.to_string(),
            },
        )),
    }
}
