//! Configuration validation utilities

use super::env::ENV_VAR_PATTERN;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::PromptlineConfig;
use tracing::warn;

/// Configuration validator with additional validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &PromptlineConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_placeholders(config)?;
        self.check_transport_security(config);

        Ok(())
    }

    /// Every placeholder must be resolved by the time the config is used
    fn validate_placeholders(&self, config: &PromptlineConfig) -> Result<(), ValidationError> {
        let endpoints = [
            ("endpoints.prefixed", &config.endpoints.prefixed),
            ("endpoints.raw", &config.endpoints.raw),
        ];
        for (path, value) in endpoints {
            if let Some(var) = self.extract_env_vars(value).into_iter().next() {
                return Err(ValidationError::new(
                    path,
                    ValidationErrorKind::UnresolvedPlaceholder {
                        placeholder: format!("${{{}}}", var),
                    },
                ));
            }
        }
        Ok(())
    }

    /// Plain HTTP to a remote host is allowed but worth a warning
    fn check_transport_security(&self, config: &PromptlineConfig) {
        for endpoint in [&config.endpoints.prefixed, &config.endpoints.raw] {
            if !self.is_loopback_or_tls(endpoint) {
                warn!("Endpoint {} sends prompts over plain HTTP", endpoint);
            }
        }
    }

    /// Whether `endpoint` uses TLS or stays on this machine
    pub fn is_loopback_or_tls(&self, endpoint: &str) -> bool {
        let Ok(url) = url::Url::parse(endpoint) else {
            return false;
        };
        if url.scheme() == "https" {
            return true;
        }
        match url.host() {
            Some(url::Host::Domain(domain)) => domain == "localhost",
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        }
    }

    /// Extract environment variables from a string
    pub fn extract_env_vars(&self, text: &str) -> Vec<String> {
        ENV_VAR_PATTERN
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}
