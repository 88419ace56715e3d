/*!
 * Mock backend adapter for testing.
 *
 * This module provides a scripted adapter that simulates different backend behaviors:
 * - `MockBackend::working(kind, fragments)` - streams the fragments, then ends
 * - `MockBackend::failing_after(kind, fragments, message)` - streams, then errors
 * - `MockBackend::rejecting(kind, error)` - refuses the call before streaming
 * - `MockBackend::unterminated(kind, fragments)` - closes without a terminal event
 */

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::model_config::{BackendKind, ModelConfig};
use crate::providers::{BackendAdapter, TokenEvent, TokenStream};
use crate::translation::TranslationJob;

/// One step of a scripted backend stream
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Emit a fragment
    Fragment(String),
    /// Signal normal completion
    End,
    /// Signal a mid-stream failure
    Fail(String),
    /// Pause before the next step
    Sleep(Duration),
}

/// Kind of pre-stream rejection to simulate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockErrorType {
    /// Authentication error (invalid API key)
    Auth,
    /// Connection error
    Connection,
    /// Rate limit error
    RateLimit,
    /// API error
    Api,
}

impl MockErrorType {
    fn to_error(self) -> ProviderError {
        match self {
            MockErrorType::Auth => ProviderError::AuthenticationError("Invalid API key".into()),
            MockErrorType::Connection => ProviderError::ConnectionError("Connection failed".into()),
            MockErrorType::RateLimit => ProviderError::RateLimitExceeded("Rate limit exceeded".into()),
            MockErrorType::Api => ProviderError::ApiError {
                status_code: 400,
                message: "Bad request".into(),
            },
        }
    }
}

/// Scripted backend adapter
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Protocol this mock pretends to speak
    kind: BackendKind,
    /// Steps replayed on every call
    script: Vec<MockStep>,
    /// Rejection returned from `start` instead of a stream
    reject_with: Option<MockErrorType>,
    /// Number of `start` calls
    call_count: Arc<AtomicUsize>,
    /// Last job and model id received
    last_call: Arc<Mutex<Option<(TranslationJob, u32)>>>,
}

impl MockBackend {
    /// Create a mock replaying the given script
    pub fn new(kind: BackendKind, script: Vec<MockStep>) -> Self {
        Self {
            kind,
            script,
            reject_with: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Streams the fragments, then ends normally
    pub fn working(kind: BackendKind, fragments: &[&str]) -> Self {
        let mut script: Vec<MockStep> = fragments.iter().map(|f| MockStep::Fragment(f.to_string())).collect();
        script.push(MockStep::End);
        Self::new(kind, script)
    }

    /// Streams the fragments, then fails
    pub fn failing_after(kind: BackendKind, fragments: &[&str], message: &str) -> Self {
        let mut script: Vec<MockStep> = fragments.iter().map(|f| MockStep::Fragment(f.to_string())).collect();
        script.push(MockStep::Fail(message.to_string()));
        Self::new(kind, script)
    }

    /// Streams the fragments and closes without a terminal event
    pub fn unterminated(kind: BackendKind, fragments: &[&str]) -> Self {
        let script = fragments.iter().map(|f| MockStep::Fragment(f.to_string())).collect();
        Self::new(kind, script)
    }

    /// Refuses every call before streaming
    pub fn rejecting(kind: BackendKind, error_type: MockErrorType) -> Self {
        let mut mock = Self::new(kind, Vec::new());
        mock.reject_with = Some(error_type);
        mock
    }

    /// Number of times `start` was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Last job received, with the id of the model it was sent to
    pub fn last_call(&self) -> Option<(TranslationJob, u32)> {
        self.last_call.lock().clone()
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn start(&self, job: &TranslationJob, config: &ModelConfig) -> Result<TokenStream, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock() = Some((job.clone(), config.id));

        if let Some(error_type) = self.reject_with {
            return Err(error_type.to_error());
        }

        let steps = self.script.clone();
        let events = stream::iter(steps)
            .then(|step| async move {
                match step {
                    MockStep::Fragment(text) => Some(TokenEvent::Fragment(text)),
                    MockStep::End => Some(TokenEvent::End),
                    MockStep::Fail(message) => Some(TokenEvent::Error(ProviderError::StreamFailed(message))),
                    MockStep::Sleep(duration) => {
                        tokio::time::sleep(duration).await;
                        None
                    }
                }
            })
            .filter_map(|event| async move { event });

        Ok(events.boxed())
    }
}
