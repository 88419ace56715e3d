/*!
 * Streaming translation relay.
 *
 * The relay takes one translation request through a fixed sequence of states:
 * - `Validating`: body, mode, input bounds and model id are checked
 * - `Dispatching`: the adapter for the model's backend kind is called
 * - `Streaming`: backend fragments are forwarded as they arrive
 * - `Completed` / `Failed`: the backend ended or broke off
 *
 * A request that fails validation, or names a model whose backend has no
 * registered adapter, ends in `Rejected` without contacting any backend.
 */

use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app_config::Config;
use crate::errors::{ProviderError, RelayError};
use crate::model_config::BackendKind;
use crate::providers::openai::OpenAI;
use crate::providers::replicate::Replicate;
use crate::providers::{BackendAdapter, TokenEvent, TokenStream, seal};

pub use self::request::{TranslationRequest, ValidatedRequest};

pub mod request;

/// Fragments forwarded to the caller; an `Err` item ends the stream abnormally
pub type RelayStream = BoxStream<'static, Result<String, RelayError>>;

/// Lifecycle of one relay invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Validating,
    Dispatching,
    Streaming,
    Completed,
    Failed,
    Rejected,
}

impl RelayState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: RelayState) -> bool {
        use RelayState::*;
        matches!(
            (self, next),
            (Validating, Dispatching)
                | (Validating, Rejected)
                | (Dispatching, Streaming)
                | (Dispatching, Rejected)
                | (Dispatching, Failed)
                | (Streaming, Completed)
                | (Streaming, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Completed | RelayState::Failed | RelayState::Rejected)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Validating => "validating",
            RelayState::Dispatching => "dispatching",
            RelayState::Streaming => "streaming",
            RelayState::Completed => "completed",
            RelayState::Failed => "failed",
            RelayState::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// State of one invocation, tagged with its request id for logging
#[derive(Debug)]
pub struct RelayRun {
    id: Uuid,
    state: RelayState,
    fragments: usize,
}

impl RelayRun {
    pub fn new() -> Self {
        let run = Self {
            id: Uuid::new_v4(),
            state: RelayState::Validating,
            fragments: 0,
        };
        debug!("[{}] {}", run.id, run.state);
        run
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Move to `next`, logging the transition
    pub fn advance(&mut self, next: RelayState) {
        if !self.state.can_transition_to(next) {
            warn!("[{}] unexpected transition {} -> {}", self.id, self.state, next);
        }
        match next {
            RelayState::Completed => info!("[{}] {} -> {} ({} fragments)", self.id, self.state, next, self.fragments),
            RelayState::Failed | RelayState::Rejected => warn!("[{}] {} -> {}", self.id, self.state, next),
            _ => debug!("[{}] {} -> {}", self.id, self.state, next),
        }
        self.state = next;
    }

    /// Record a rejection and hand the error back
    fn reject(&mut self, error: RelayError) -> RelayError {
        warn!("[{}] {}", self.id, error);
        self.advance(RelayState::Rejected);
        error
    }

    fn fail(&mut self, error: RelayError) -> RelayError {
        warn!("[{}] {}", self.id, error);
        self.advance(RelayState::Failed);
        error
    }
}

impl Default for RelayRun {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RelayRun {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            info!("[{}] caller went away while {}", self.id, self.state);
        }
    }
}

/// Dispatches validated requests to backend adapters and relays their output
#[derive(Debug, Clone)]
pub struct StreamingRelay {
    /// One adapter per backend kind
    adapters: HashMap<BackendKind, Arc<dyn BackendAdapter>>,
    /// Longest accepted input in characters
    max_input_chars: usize,
    /// Longest wait for the next backend event
    idle_timeout: Option<Duration>,
}

impl StreamingRelay {
    /// Create a relay with no adapters registered
    pub fn new(max_input_chars: usize, idle_timeout: Option<Duration>) -> Self {
        Self {
            adapters: HashMap::new(),
            max_input_chars,
            idle_timeout,
        }
    }

    /// Register an adapter under the backend kind it reports
    pub fn with_adapter(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    /// Build a relay with an adapter for every backend that has credentials
    pub fn from_config(config: &Config) -> Self {
        let mut relay = Self::new(config.relay.max_input_chars, config.relay.idle_timeout());

        let openai = &config.providers.openai;
        if openai.has_credentials() {
            relay = relay.with_adapter(Arc::new(OpenAI::with_connect_timeout(
                openai.api_key.clone(),
                openai.endpoint.clone(),
                openai.connect_timeout_secs,
            )));
        } else {
            warn!("OpenAI API key missing; chat completion models are disabled");
        }

        let replicate = &config.providers.replicate;
        if replicate.has_credentials() {
            relay = relay.with_adapter(Arc::new(Replicate::with_connect_timeout(
                replicate.api_key.clone(),
                replicate.endpoint.clone(),
                replicate.connect_timeout_secs,
            )));
        } else {
            warn!("Replicate API token missing; raw completion models are disabled");
        }

        relay
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// Whether requests for this backend kind can be served
    pub fn supports(&self, kind: BackendKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Parse a raw JSON body and relay it
    pub async fn relay_body(&self, body: &[u8]) -> Result<RelayStream, RelayError> {
        let mut run = RelayRun::new();
        match TranslationRequest::from_body(body) {
            Ok(request) => self.run(run, request).await,
            Err(e) => Err(run.reject(e)),
        }
    }

    /// Relay an already parsed request
    pub async fn dispatch(&self, request: TranslationRequest) -> Result<RelayStream, RelayError> {
        self.run(RelayRun::new(), request).await
    }

    async fn run(&self, mut run: RelayRun, request: TranslationRequest) -> Result<RelayStream, RelayError> {
        let validated = match request.validate(self.max_input_chars) {
            Ok(validated) => validated,
            Err(e) => return Err(run.reject(e)),
        };
        let ValidatedRequest { job, config } = validated;

        run.advance(RelayState::Dispatching);
        let Some(adapter) = self.adapters.get(&config.backend_kind) else {
            warn!("[{}] no adapter registered for {}", run.id(), config.backend_kind);
            return Err(run.reject(RelayError::ConfigNotFound(i64::from(config.id))));
        };

        debug!(
            "[{}] {} via {} ({} chars)",
            run.id(),
            job.mode,
            config.display_name,
            job.text.chars().count()
        );

        let events = match adapter.start(&job, config).await {
            Ok(events) => events,
            Err(e) => return Err(run.fail(RelayError::BackendDispatch(e))),
        };

        run.advance(RelayState::Streaming);
        Ok(forward(run, seal(events), self.idle_timeout))
    }
}

struct ForwardState {
    run: RelayRun,
    events: TokenStream,
    idle_timeout: Option<Duration>,
}

/// Turn sealed backend events into the caller-facing stream
fn forward(run: RelayRun, events: TokenStream, idle_timeout: Option<Duration>) -> RelayStream {
    let state = ForwardState { run, events, idle_timeout };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;

        let next = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, state.events.next()).await {
                Ok(event) => event,
                Err(_) => Some(TokenEvent::Error(ProviderError::IdleTimeout(limit.as_secs()))),
            },
            None => state.events.next().await,
        };

        match next {
            Some(TokenEvent::Fragment(text)) => {
                state.run.fragments += 1;
                Some((Ok(text), Some(state)))
            }
            Some(TokenEvent::Error(e)) => {
                let error = state.run.fail(RelayError::BackendStream(e));
                Some((Err(error), None))
            }
            Some(TokenEvent::End) | None => {
                state.run.advance(RelayState::Completed);
                None
            }
        }
    })
    .boxed()
}
