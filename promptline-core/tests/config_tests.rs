//! Integration tests for configuration loading and validation

use promptline_core::config::{
    load_from_json, load_from_path, load_from_yaml, ConfigError, ValidationErrorKind,
};
use promptline_core::protocol::{BackendMode, Provider};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    use std::env;
    env::set_var("PROMPTLINE_CHAT_HOST", "localhost:3000");

    let yaml = r#"
version: "0.1"
endpoints:
  prefixed: http://${PROMPTLINE_CHAT_HOST}/api/chat
  raw: http://127.0.0.1:5000/
connection:
  connect_timeout_ms: 2000
  request_timeout_ms: 120000
stream:
  flush_trailing_line: false
  max_line_bytes: 65536
defaults:
  backend: python
  provider: Anthropic
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    let config = load_from_yaml(path).expect("config should load");
    assert_eq!(config.version, "0.1");
    assert_eq!(config.endpoints.prefixed, "http://localhost:3000/api/chat");
    assert_eq!(config.connection.request_timeout(), Some(Duration::from_secs(120)));
    assert_eq!(config.stream.max_line_bytes, 65536);
    assert_eq!(config.defaults.backend, BackendMode::Python);
    assert_eq!(config.defaults.provider, Provider::Anthropic);

    env::remove_var("PROMPTLINE_CHAT_HOST");
}

#[test]
fn test_load_valid_json_config() {
    let json = r#"{
        "version": "0.1",
        "endpoints": { "raw": "http://127.0.0.1:8000/" },
        "defaults": { "backend": "nextjs", "provider": "OpenAI" }
    }"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.json", json);

    let config = load_from_json(&path).expect("config should load");
    assert_eq!(config.endpoints.raw, "http://127.0.0.1:8000/");
    assert_eq!(config.endpoints.prefixed, "http://localhost:3000/api/chat");

    // extension dispatch picks the same loader
    let again = load_from_path(&path).unwrap();
    assert_eq!(again, config);
}

#[test]
fn test_missing_env_var_reported() {
    let yaml = r#"
version: "0.1"
endpoints:
  raw: ${PROMPTLINE_UNSET_ENDPOINT}
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::MissingEnvVar { var }) => assert_eq!(var, "PROMPTLINE_UNSET_ENDPOINT"),
        other => panic!("Expected MissingEnvVar, got {:?}", other),
    }
}

#[test]
fn test_parse_error_has_location() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", "version: \"0.1\"\nstream: [unclosed\n");

    match load_from_yaml(path) {
        Err(ConfigError::Syntax { location, .. }) => {
            assert!(location.is_some());
        }
        other => panic!("Expected Syntax, got {:?}", other),
    }
}

#[test]
fn test_wrong_version_rejected() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", "version: \"2.0\"\n");

    match load_from_yaml(path) {
        Err(ConfigError::Invalid(err)) => {
            assert_eq!(err.field_path, "version");
            assert_eq!(
                err.kind,
                ValidationErrorKind::UnsupportedVersion {
                    found: "2.0".to_string(),
                    expected: "0.1",
                }
            );
        }
        other => panic!("Expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_zero_line_limit_rejected() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(
        &dir,
        "config.json",
        r#"{"version": "0.1", "stream": {"max_line_bytes": 0}}"#,
    );

    match load_from_json(path) {
        Err(ConfigError::Invalid(err)) => {
            assert_eq!(err.field_path, "stream.max_line_bytes");
            assert_eq!(err.kind, ValidationErrorKind::Zero);
        }
        other => panic!("Expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.toml", "version = \"0.1\"");

    assert!(matches!(
        load_from_path(path),
        Err(ConfigError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_missing_file() {
    let result = load_from_yaml("/nonexistent/promptline.yaml");
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}
