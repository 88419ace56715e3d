/*!
 * Tests for configuration loading and the relay built from it
 */

use std::collections::HashMap;

use gagana::app_config::{Config, OPENAI_API_KEY_ENV, REPLICATE_API_KEY_ENV};
use gagana::{BackendKind, StreamingRelay};

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = Config::load_or_create(&path).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse config file"));
}

#[test]
fn test_loadOrCreate_shouldReadCustomValues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "server": {"host": "0.0.0.0", "port": 9000, "allow_any_origin": true},
            "relay": {"max_input_chars": 500, "idle_timeout_secs": 0},
            "providers": {"openai": {"api_key": "sk-file"}},
            "database": {"path": "/tmp/gagana-test.db"}
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.server.allow_any_origin);
    assert_eq!(config.relay.max_input_chars, 500);
    assert!(config.relay.idle_timeout().is_none());
    assert!(config.providers.openai.has_credentials());
    assert!(!config.providers.replicate.has_credentials());
    assert_eq!(config.providers.replicate.endpoint, "https://api.replicate.com/v1");
    assert!(config.database.custom_path().is_some());
}

#[test]
fn test_validate_withZeroPortOrLimit_shouldFail() {
    let mut config = Config::default();
    config.server.port = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.relay.max_input_chars = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_fromConfig_shouldOnlyRegisterBackendsWithCredentials() {
    let mut config = Config::default();
    let relay = StreamingRelay::from_config(&config);
    assert!(!relay.supports(BackendKind::HostedChatCompletion));
    assert!(!relay.supports(BackendKind::HostedRawCompletion));

    let env: HashMap<&str, &str> = HashMap::from([(OPENAI_API_KEY_ENV, "sk-test"), (REPLICATE_API_KEY_ENV, "r8-test")]);
    config.apply_overrides_from(|name| env.get(name).map(|v| v.to_string()));

    let relay = StreamingRelay::from_config(&config);
    assert!(relay.supports(BackendKind::HostedChatCompletion));
    assert!(relay.supports(BackendKind::HostedRawCompletion));
    assert_eq!(relay.max_input_chars(), 8000);
}
