//! Core protocol types for the chat request exchanged with a backend
//!
//! This module contains the data structures sent to a backend collaborator and
//! the enums selecting which provider and which backend handle a request. The
//! design prioritizes:
//! - Exact wire spellings (`OpenAI`, `Anthropic`, `currentModel`, ...)
//! - Type safety: an unknown provider cannot be constructed, only rejected
//! - A single place for the backend's validation contract

use crate::stream::FramingMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length (in characters) of the system prompt and the user input
pub const MAX_INPUT_LENGTH: usize = 24_000;

/// Language-model vendor that should answer the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    #[default]
    OpenAI,
    Anthropic,
}

impl Provider {
    /// Wire spelling of this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }

    /// All providers in display order
    pub fn all() -> [Provider; 2] {
        [Provider::OpenAI, Provider::Anthropic]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OpenAI" => Ok(Provider::OpenAI),
            "Anthropic" => Ok(Provider::Anthropic),
            other => Err(UnknownVariant {
                kind: "provider",
                value: other.to_string(),
            }),
        }
    }
}

/// Backend collaborator a request is sent to
///
/// Each backend streams its answer with a different framing convention, so the
/// mode also decides how the response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Data-stream backend emitting `0:"..."` prefixed frames
    #[default]
    NextJs,
    /// Plain text backend emitting raw deltas
    Python,
}

impl BackendMode {
    /// Framing convention used by this backend's response body
    pub fn framing(&self) -> FramingMode {
        match self {
            BackendMode::NextJs => FramingMode::Prefixed,
            BackendMode::Python => FramingMode::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::NextJs => "nextjs",
            BackendMode::Python => "python",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nextjs" | "next.js" | "next" => Ok(BackendMode::NextJs),
            "python" => Ok(BackendMode::Python),
            _ => Err(UnknownVariant {
                kind: "backend mode",
                value: s.to_string(),
            }),
        }
    }
}

/// A string did not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Body of the outbound chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Provider that should answer
    #[serde(rename = "currentModel")]
    pub current_model: Provider,

    /// System prompt, possibly empty
    #[serde(rename = "sysPrompt")]
    pub sys_prompt: String,

    /// User message, never empty once validated
    #[serde(rename = "userData")]
    pub user_data: String,
}

impl ChatPayload {
    /// Create a new payload
    pub fn new(
        current_model: Provider,
        sys_prompt: impl Into<String>,
        user_data: impl Into<String>,
    ) -> Self {
        Self {
            current_model,
            sys_prompt: sys_prompt.into(),
            user_data: user_data.into(),
        }
    }

    /// Apply the validation a backend performs before it starts streaming
    ///
    /// Lengths are counted in characters, not bytes.
    pub fn validate(&self, max_len: usize) -> Result<(), PayloadError> {
        if self.user_data.is_empty() {
            return Err(PayloadError::EmptyUserInput);
        }
        check_length("sysPrompt", &self.sys_prompt, max_len)?;
        check_length("userData", &self.user_data, max_len)?;
        Ok(())
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), PayloadError> {
    let len = value.chars().count();
    if len > max {
        return Err(PayloadError::TooLong { field, len, max });
    }
    Ok(())
}

/// Reasons a payload fails validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("user input is required")]
    EmptyUserInput,

    #[error("field '{field}' is {len} characters long, maximum is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
