//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::PromptlineConfig;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

/// `${VAR}` placeholder with an upper-case variable name
pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    // Report the first missing variable (to match the error type)
    if let Some(var) = missing_vars.first() {
        return Err(ConfigError::MissingEnvVar { var: var.clone() });
    }

    Ok(result)
}

/// Interpolate environment variables left in endpoint URLs after loading
///
/// Endpoints are the only string fields a deployment usually templates.
pub fn interpolate_config_env_vars(config: &mut PromptlineConfig) -> Result<(), ConfigError> {
    for endpoint in [&mut config.endpoints.prefixed, &mut config.endpoints.raw] {
        if ENV_VAR_PATTERN.is_match(endpoint) {
            *endpoint = interpolate_env_vars(endpoint)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("PROMPTLINE_TEST_HOST", "backend.internal");

        let content = "raw: http://${PROMPTLINE_TEST_HOST}:5000/";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "raw: http://backend.internal:5000/");

        env::remove_var("PROMPTLINE_TEST_HOST");
    }

    #[test]
    fn test_missing_env_var() {
        let content = "prefixed: ${PROMPTLINE_MISSING_VAR}";
        let result = interpolate_env_vars(content);

        if let Err(ConfigError::MissingEnvVar { var }) = result {
            assert_eq!(var, "PROMPTLINE_MISSING_VAR");
        } else {
            panic!("Expected MissingEnvVar error");
        }
    }

    #[test]
    fn test_interpolate_config_endpoints() {
        env::set_var("PROMPTLINE_TEST_PORT", "8081");

        let mut config = PromptlineConfig::default();
        config.endpoints.raw = "http://127.0.0.1:${PROMPTLINE_TEST_PORT}/".to_string();
        interpolate_config_env_vars(&mut config).unwrap();
        assert_eq!(config.endpoints.raw, "http://127.0.0.1:8081/");

        env::remove_var("PROMPTLINE_TEST_PORT");
    }
}
