/*!
 * Tests for error types and their user-facing messages
 */

use gagana::errors::{AppError, MODEL_UNAVAILABLE_MESSAGE, ProviderError, RelayError, StoreError};

#[test]
fn test_fromStatus_shouldClassifyAuthAndRateLimits() {
    assert!(matches!(ProviderError::from_status(401, "bad key"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(403, "forbidden"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(429, "slow down"), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(
        ProviderError::from_status(503, "overloaded"),
        ProviderError::ApiError { status_code: 503, .. }
    ));
}

#[test]
fn test_configNotFound_userMessage_shouldSuggestAnotherModel() {
    let error = RelayError::ConfigNotFound(99);
    assert_eq!(error.user_message(), MODEL_UNAVAILABLE_MESSAGE);
    assert!(error.to_string().contains("99"));
}

#[test]
fn test_isPreStream_shouldOnlyExcludeStreamFailures() {
    assert!(RelayError::Validation("empty".into()).is_pre_stream());
    assert!(RelayError::BackendDispatch(ProviderError::ConnectionError("refused".into())).is_pre_stream());
    assert!(!RelayError::BackendStream(ProviderError::IdleTimeout(120)).is_pre_stream());
}

#[test]
fn test_relayError_shouldExposeProviderSource() {
    use std::error::Error;

    let error = RelayError::BackendStream(ProviderError::StreamFailed("model crashed".into()));
    let source = error.source().expect("provider error should be the source");
    assert!(source.to_string().contains("model crashed"));
}

#[test]
fn test_appError_conversions_shouldKeepMessages() {
    let from_store: AppError = StoreError::NotFound("abc".into()).into();
    assert!(matches!(&from_store, AppError::Persistence(msg) if msg.contains("abc")));

    let from_io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "conf.json").into();
    assert!(matches!(from_io, AppError::File(_)));

    let from_anyhow: AppError = anyhow::anyhow!("disk full").context("Failed to open database").into();
    assert!(matches!(&from_anyhow, AppError::Unknown(msg) if msg.contains("Failed to open database") && msg.contains("disk full")));
}
