/*!
 * Tests for the model catalog
 */

use gagana::model_config::{self, BackendKind, DEFAULT_MODEL_CONFIG_ID};

#[test]
fn test_lookup_shouldResolveEveryCatalogEntry() {
    for config in model_config::all() {
        let found = model_config::lookup(i64::from(config.id)).expect("catalog entry should resolve");
        assert_eq!(found.id, config.id);
    }
}

#[test]
fn test_lookup_withUnknownId_shouldReturnNone() {
    assert!(model_config::lookup(0).is_none());
    assert!(model_config::lookup(-1).is_none());
    assert!(model_config::lookup(i64::MAX).is_none());
}

#[test]
fn test_defaultModel_shouldUseChatCompletion() {
    let config = model_config::lookup(i64::from(DEFAULT_MODEL_CONFIG_ID)).unwrap();
    assert_eq!(config.backend_kind, BackendKind::HostedChatCompletion);
}

#[test]
fn test_catalog_shouldCoverBothBackends() {
    let kinds: Vec<BackendKind> = model_config::all().iter().map(|c| c.backend_kind).collect();
    assert!(kinds.contains(&BackendKind::HostedChatCompletion));
    assert!(kinds.contains(&BackendKind::HostedRawCompletion));
}

#[test]
fn test_serialize_shouldHideBackendParameters() {
    let json = serde_json::to_value(model_config::all()).unwrap();
    let first = &json[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["backendKind"], "hostedChatCompletion");
    assert!(first.get("modelIdentifier").is_none());
    assert!(first.get("temperature").is_none());
}
