/*!
 * Inbound translation requests and their validation.
 */

use serde::{Deserialize, Serialize};

use crate::errors::RelayError;
use crate::language_utils::TranslateMode;
use crate::model_config::{self, ModelConfig};
use crate::translation::TranslationJob;

/// Body of a translation request as sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    // @field: Direction such as "enToSm"
    pub translate_mode: String,
    // @field: Text to translate
    pub input: String,
    // @field: Catalog id of the model to use
    pub model_config_id: i64,
}

/// A request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub job: TranslationJob,
    pub config: &'static ModelConfig,
}

impl TranslationRequest {
    pub fn new(translate_mode: impl Into<String>, input: impl Into<String>, model_config_id: i64) -> Self {
        Self {
            translate_mode: translate_mode.into(),
            input: input.into(),
            model_config_id,
        }
    }

    /// Parse a JSON request body
    pub fn from_body(body: &[u8]) -> Result<Self, RelayError> {
        serde_json::from_slice(body).map_err(|e| RelayError::Validation(format!("Malformed request body: {}", e)))
    }

    /// Check mode, input bounds and model id
    ///
    /// Input is measured in characters and never truncated.
    pub fn validate(&self, max_input_chars: usize) -> Result<ValidatedRequest, RelayError> {
        let mode: TranslateMode = self
            .translate_mode
            .parse()
            .map_err(|e: anyhow::Error| RelayError::Validation(e.to_string()))?;

        if self.input.trim().is_empty() {
            return Err(RelayError::Validation("Input text is empty".to_string()));
        }

        let length = self.input.chars().count();
        if length > max_input_chars {
            return Err(RelayError::Validation(format!(
                "Input is {} characters long; the limit is {}",
                length, max_input_chars
            )));
        }

        let config = model_config::lookup(self.model_config_id)
            .ok_or(RelayError::ConfigNotFound(self.model_config_id))?;

        Ok(ValidatedRequest {
            job: TranslationJob::new(mode, self.input.clone()),
            config,
        })
    }
}
