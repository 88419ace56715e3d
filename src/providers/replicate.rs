use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error, warn};
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
pub const DEFAULT_ENDPOINT: &str = "https://api.replicate.com/v1";

/// Replicate client: submits predictions and follows their event streams
pub struct Replicate {
    /// HTTP client for API requests
    client: Client,
    /// API token for authentication
    api_key: String,
    /// API base URL
    endpoint: String,
}

/// Prediction creation request
#[derive(Debug, Serialize)]
pub struct PredictionRequest {
    /// Model version hash
    version: String,
    /// Model inputs
    input: PredictionInput,
    /// Request a stream URL for the output
    stream: bool,
}

/// Inputs understood by the chat-tuned Llama models
#[derive(Debug, Serialize)]
pub struct PredictionInput {
    /// Text to translate
    pub prompt: String,
    /// Instruction placed before the prompt
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
}

/// Prediction as returned by the API
#[derive(Debug, Deserialize)]
pub struct Prediction {
    /// Prediction id
    pub id: String,
    /// starting, processing, succeeded, failed or canceled
    #[serde(default)]
    pub status: String,
    /// Follow-up URLs
    #[serde(default)]
    pub urls: PredictionUrls,
    /// Failure detail when status is failed
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
    pub cancel: Option<String>,
    pub stream: Option<String>,
}

impl PredictionRequest {
    pub fn input(&self) -> &PredictionInput {
        &self.input
    }
}

/// Cancels a prediction whose stream is dropped before it finished
struct CancelOnDrop {
    client: Client,
    api_key: String,
    url: Option<String>,
}

impl CancelOnDrop {
    fn disarm(&mut self) {
        self.url = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        let Some(url) = self.url.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.client.clone();
        let api_key = std::mem::take(&mut self.api_key);
        handle.spawn(async move {
            match client.post(&url).bearer_auth(api_key).send().await {
                Ok(response) => debug!("Cancelled abandoned prediction ({})", response.status()),
                Err(e) => warn!("Failed to cancel abandoned prediction: {}", e),
            }
        });
    }
}

impl Replicate {
    /// Create a new Replicate client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_connect_timeout(api_key, endpoint, 10)
    }

    /// Create a client with a custom connect timeout
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

    fn predictions_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/predictions", base)
    }

    /// Build the prediction request for a job
    pub fn build_request(job: &TranslationJob, config: &ModelConfig) -> PredictionRequest {
        PredictionRequest {
            version: config.model_identifier.to_string(),
            input: PredictionInput {
                prompt: job.text.clone(),
                system_prompt: job.system_prompt(&PromptTemplate::raw_translator()),
                temperature: Some(config.temperature),
                max_new_tokens: Some(config.max_output_tokens),
            },
            stream: true,
        }
    }

    /// Submit a prediction job
    pub async fn create_prediction(&self, request: &PredictionRequest) -> Result<Prediction, ProviderError> {
        let response = self
            .client
            .post(self.predictions_url())
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            error!("Replicate API error: {}", err);
            return Err(err);
        }

        let prediction = response
            .json::<Prediction>()
            .await?;

        if prediction.status == "failed" || prediction.status == "canceled" {
            let detail = prediction
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| prediction.status.clone());
            return Err(ProviderError::RequestFailed(format!("Prediction {} {}", prediction.id, detail)));
        }

        debug!("Created prediction {} ({})", prediction.id, prediction.status);
        Ok(prediction)
    }

    /// Open the event stream of a created prediction
    pub async fn stream_prediction(&self, prediction: &Prediction) -> Result<TokenStream, ProviderError> {
        let stream_url = prediction.urls.stream.clone().ok_or_else(|| {
            ProviderError::ParseError(format!("Prediction {} has no stream URL", prediction.id))
        })?;

        let mut guard = CancelOnDrop {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            url: prediction.urls.cancel.clone(),
        };

        let response = self
            .client
            .get(&stream_url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-store")
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            error!("Replicate stream error: {}", err);
            return Err(err);
        }

        let events = sse_token_stream(response.bytes_stream().boxed(), Self::interpret_event);
        Ok(events
            .map(move |event| {
                if event.is_terminal() {
                    guard.disarm();
                }
                event
            })
            .boxed())
    }

    /// Map one prediction stream event to a token event
    pub fn interpret_event(event: SseEvent) -> Option<TokenEvent> {
        match event.event.as_str() {
            "output" => {
                if event.data.is_empty() {
                    None
                } else {
                    Some(TokenEvent::Fragment(event.data))
                }
            }
            "error" => Some(TokenEvent::Error(ProviderError::StreamFailed(event.data))),
            "done" => {
                let reason = serde_json::from_str::<serde_json::Value>(&event.data)
                    .ok()
                    .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
                    .filter(|r| !r.is_empty());
                match reason {
                    Some(reason) => Some(TokenEvent::Error(ProviderError::StreamFailed(format!(
                        "prediction ended early: {}",
                        reason
                    )))),
                    None => Some(TokenEvent::End),
                }
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Replicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replicate")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BackendAdapter for Replicate {
    fn kind(&self) -> BackendKind {
        BackendKind::HostedRawCompletion
    }

    async fn start(&self, job: &TranslationJob, config: &ModelConfig) -> Result<TokenStream, ProviderError> {
        let request = Self::build_request(job, config);
        let prediction = self.create_prediction(&request).await?;
        self.stream_prediction(&prediction).await
    }
}
