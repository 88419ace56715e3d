/*!
 * Backend adapters for hosted model APIs.
 *
 * Every adapter turns a `TranslationJob` into a streaming call against one
 * hosted API and exposes the result as a uniform stream of `TokenEvent`s:
 * - `openai`: chat completions with token streaming
 * - `replicate`: prediction jobs followed through their event stream
 * - `mock`: scripted adapter for tests
 */

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::model_config::{BackendKind, ModelConfig};
use crate::translation::TranslationJob;

use self::sse::{SseDecoder, SseEvent};

pub mod mock;
pub mod openai;
pub mod replicate;
pub mod sse;

/// One item produced by a backend while translating
#[derive(Debug)]
pub enum TokenEvent {
    /// Next piece of output text
    Fragment(String),
    /// The backend finished normally
    End,
    /// The backend failed; nothing follows
    Error(ProviderError),
}

impl TokenEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TokenEvent::Fragment(_))
    }
}

/// Lazy, finite, non-restartable sequence of backend events
pub type TokenStream = BoxStream<'static, TokenEvent>;

/// Common trait for all backend adapters
///
/// `start` returns an error only when the backend refuses the call before
/// producing anything. Failures after that point arrive as
/// `TokenEvent::Error` inside the stream.
#[async_trait]
pub trait BackendAdapter: Send + Sync + Debug {
    /// Protocol this adapter speaks
    fn kind(&self) -> BackendKind;

    /// Begin a streaming translation
    async fn start(&self, job: &TranslationJob, config: &ModelConfig) -> Result<TokenStream, ProviderError>;
}

/// Enforce the terminal-event contract on an adapter stream
///
/// The returned stream ends right after the first `End` or `Error`, and a
/// stream that runs dry without either yields a `StreamInterrupted` error.
pub fn seal(inner: TokenStream) -> TokenStream {
    stream::unfold(Some(inner), |state| async move {
        let mut inner = state?;
        match inner.next().await {
            Some(TokenEvent::Fragment(text)) => Some((TokenEvent::Fragment(text), Some(inner))),
            Some(terminal) => Some((terminal, None)),
            None => Some((
                TokenEvent::Error(ProviderError::StreamInterrupted(
                    "backend closed the stream without signalling completion".to_string(),
                )),
                None,
            )),
        }
    })
    .boxed()
}

struct SseBodyState<F> {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<TokenEvent>,
    interpret: F,
    finished: bool,
}

impl<F> SseBodyState<F>
where
    F: FnMut(SseEvent) -> Option<TokenEvent>,
{
    fn enqueue(&mut self, event: SseEvent) {
        if let Some(token) = (self.interpret)(event) {
            self.pending.push_back(token);
        }
    }
}

/// Decode an event-stream response body into token events
///
/// `interpret` maps each server-sent event to at most one token event.
pub(crate) fn sse_token_stream<F>(body: BoxStream<'static, reqwest::Result<Bytes>>, interpret: F) -> TokenStream
where
    F: FnMut(SseEvent) -> Option<TokenEvent> + Send + 'static,
{
    let state = SseBodyState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        interpret,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for event in state.decoder.push(&chunk) {
                        state.enqueue(event);
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(TokenEvent::Error(ProviderError::StreamInterrupted(e.to_string())));
                }
                None => {
                    state.finished = true;
                    if let Some(event) = state.decoder.finish() {
                        state.enqueue(event);
                    }
                }
            }
        }
    })
    .boxed()
}

/// Read an error body and turn it into a provider error
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    ProviderError::from_status(status, error_text)
}
