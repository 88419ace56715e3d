use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::model_config::{BackendKind, ModelConfig};
use crate::translation::{PromptTemplate, TranslationJob};

use super::sse::SseEvent;
use super::{BackendAdapter, TokenEvent, TokenStream, error_from_response, sse_token_stream};

/// Default public API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// OpenAI client driving the chat completions API in streaming mode
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL
    endpoint: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,

    /// Whether to stream tokens as they are generated
    stream: bool,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// One `data:` payload of a streamed completion
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChunk {
    #[serde(default)]
    pub choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChoice {
    #[serde(default)]
    pub delta: OpenAIDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenAIDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenAIRequest {
    /// Create a new chat completion request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask for a token stream instead of a single response
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn messages(&self) -> &[OpenAIMessage] {
        &self.messages
    }
}

impl OpenAI {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_connect_timeout(api_key, endpoint, 10)
    }

    /// Create a client with a custom connect timeout
    ///
    /// No overall request timeout is set: completions are streamed for as
    /// long as the model keeps producing tokens.
    pub fn with_connect_timeout(api_key: impl Into<String>, endpoint: impl Into<String>, connect_timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(connect_timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    fn completions_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/chat/completions", base)
    }

    /// Build the two-message streaming request for a job
    pub fn build_request(job: &TranslationJob, config: &ModelConfig) -> OpenAIRequest {
        let system_prompt = job.system_prompt(&PromptTemplate::chat_translator());
        OpenAIRequest::new(config.model_identifier)
            .add_message("system", system_prompt)
            .add_message("user", job.text.clone())
            .temperature(config.temperature)
            .max_tokens(config.max_output_tokens)
            .streaming()
    }

    /// Send a streaming completion request
    pub async fn stream_completion(&self, request: OpenAIRequest) -> Result<TokenStream, ProviderError> {
        let response = self
            .client
            .post(self.completions_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            error!("OpenAI API error: {}", err);
            return Err(err);
        }

        debug!("OpenAI stream opened for model {}", request.model);
        Ok(sse_token_stream(response.bytes_stream().boxed(), Self::interpret_event))
    }

    /// Map one server-sent event of a completion stream to a token event
    pub fn interpret_event(event: SseEvent) -> Option<TokenEvent> {
        let data = event.data.trim();
        if data == "[DONE]" {
            return Some(TokenEvent::End);
        }

        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                return Some(TokenEvent::Error(ProviderError::ParseError(format!(
                    "Invalid stream chunk from OpenAI API: {}",
                    e
                ))));
            }
        };

        if let Some(err) = value.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Some(TokenEvent::Error(ProviderError::StreamFailed(message)));
        }

        let chunk: OpenAIStreamChunk = match serde_json::from_value(value) {
            Ok(chunk) => chunk,
            Err(e) => {
                return Some(TokenEvent::Error(ProviderError::ParseError(e.to_string())));
            }
        };

        chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(TokenEvent::Fragment)
    }
}

impl fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAI")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BackendAdapter for OpenAI {
    fn kind(&self) -> BackendKind {
        BackendKind::HostedChatCompletion
    }

    async fn start(&self, job: &TranslationJob, config: &ModelConfig) -> Result<TokenStream, ProviderError> {
        self.stream_completion(Self::build_request(job, config)).await
    }
}
