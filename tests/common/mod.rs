/*!
 * Common test utilities for the gagana test suite
 */

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpListener;

use gagana::database::{Feedback, NewTranslationRecord, Repository, TranslationRecord, TranslationStore};
use gagana::errors::StoreError;
use gagana::providers::sse::SseDecoder;
use gagana::relay::StreamingRelay;
use gagana::server::{AppState, build_router};

// Re-export the fake backend servers
pub mod fake_backends;

/// Routes library logs to the test harness output, once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates an in-memory repository
pub fn test_repository() -> Arc<Repository> {
    Arc::new(Repository::new_in_memory().expect("Failed to create in-memory repository"))
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl TranslationStore for FailingStore {
    async fn create_translation(&self, _record: NewTranslationRecord) -> Result<String, StoreError> {
        Err(StoreError::Database(anyhow::anyhow!("disk I/O error")))
    }

    async fn update_feedback(&self, _transaction_id: &str, _feedback: Feedback) -> Result<(), StoreError> {
        Err(StoreError::Database(anyhow::anyhow!("disk I/O error")))
    }

    async fn get_translation(&self, _transaction_id: &str) -> Result<Option<TranslationRecord>, StoreError> {
        Err(StoreError::Database(anyhow::anyhow!("disk I/O error")))
    }
}

/// Serves the application router on an ephemeral port and returns its base URL
pub async fn spawn_app(relay: StreamingRelay, store: Arc<dyn TranslationStore>) -> String {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let state = Arc::new(AppState::new(relay, store, "anonymous"));

    tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(state, false)).await;
    });

    format!("http://{}", addr)
}

/// What a client observed on an event-stream response
#[derive(Debug, Default)]
pub struct SseCapture {
    /// `data` of every event, in arrival order
    pub fragments: Vec<String>,
    /// Whether the body ended normally rather than being cut off
    pub clean_end: bool,
}

impl SseCapture {
    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

/// Reads an event-stream response to its end
pub async fn read_sse(response: reqwest::Response) -> SseCapture {
    let mut capture = SseCapture::default();
    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    loop {
        match body.next().await {
            Some(Ok(chunk)) => {
                capture.fragments.extend(decoder.push(&chunk).into_iter().map(|event| event.data));
            }
            Some(Err(_)) => return capture,
            None => {
                capture.fragments.extend(decoder.finish().map(|event| event.data));
                capture.clean_end = true;
                return capture;
            }
        }
    }
}
