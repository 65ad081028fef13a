//! Errors raised while loading and checking a Promptline configuration

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where a syntax error was found, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub(crate) fn from_yaml(error: &serde_yaml::Error) -> Option<Self> {
        error.location().map(|l| Self {
            line: l.line(),
            column: l.column(),
        })
    }

    pub(crate) fn from_json(error: &serde_json::Error) -> Option<Self> {
        // serde_json reports line 0 for errors without a position
        (error.line() > 0).then(|| Self {
            line: error.line(),
            column: error.column(),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Failure to produce a usable [`PromptlineConfig`](super::PromptlineConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("syntax error in '{path}'{}: {message}", at(.location))]
    Syntax {
        path: String,
        location: Option<Location>,
        message: String,
    },

    #[error("${{{var}}} is referenced but the environment variable is not set")]
    MissingEnvVar { var: String },

    #[error("cannot tell the format of '{path}' (use .yaml, .yml or .json)")]
    UnsupportedFormat { path: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn at(location: &Option<Location>) -> String {
    location.map(|l| format!(" at {}", l)).unwrap_or_default()
}

/// A value that parsed but cannot be used, with the dotted path to it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid '{field_path}': {kind}")]
pub struct ValidationError {
    /// e.g. `endpoints.raw` or `stream.max_line_bytes`
    pub field_path: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
        }
    }
}

/// What is wrong with a configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("version {found:?} is not supported, expected {expected:?}")]
    UnsupportedVersion {
        found: String,
        expected: &'static str,
    },

    #[error("endpoint URL is empty")]
    EmptyEndpoint,

    #[error("not a URL: {reason}")]
    MalformedEndpoint { reason: String },

    #[error("endpoint scheme must be http or https, got {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("must be greater than zero")]
    Zero,

    #[error("{request_ms} ms is shorter than the connect timeout ({connect_ms} ms)")]
    TimeoutBelowConnect { request_ms: u64, connect_ms: u64 },

    #[error("placeholder {placeholder} was left unresolved")]
    UnresolvedPlaceholder { placeholder: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_mentions_location() {
        let err = ConfigError::Syntax {
            path: "promptline.yaml".to_string(),
            location: Some(Location { line: 3, column: 9 }),
            message: "did not find expected node".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "syntax error in 'promptline.yaml' at line 3, column 9: did not find expected node"
        );

        let err = ConfigError::Syntax {
            path: "promptline.json".to_string(),
            location: None,
            message: "EOF".to_string(),
        };
        assert_eq!(err.to_string(), "syntax error in 'promptline.json': EOF");
    }

    #[test]
    fn test_json_location() {
        let err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": ]").unwrap_err();
        assert_eq!(Location::from_json(&err).map(|l| l.line), Some(2));
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = ConfigError::from(ValidationError::new(
            "connection.request_timeout_ms",
            ValidationErrorKind::TimeoutBelowConnect {
                request_ms: 500,
                connect_ms: 10000,
            },
        ));
        assert_eq!(
            err.to_string(),
            "invalid 'connection.request_timeout_ms': 500 ms is shorter than the connect timeout (10000 ms)"
        );

        let err = ConfigError::MissingEnvVar {
            var: "CHAT_HOST".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "${CHAT_HOST} is referenced but the environment variable is not set"
        );
    }
}
