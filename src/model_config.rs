/*!
 * Model configuration registry.
 *
 * A fixed catalog of the models users can pick from. Each entry names the
 * backend protocol it speaks and the generation parameters sent with every
 * request. The catalog is static data; lookups never fall back to a default.
 */

use serde::Serialize;
use std::fmt;

/// Backend protocols the relay knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    /// Chat-style API with a structured message list and token streaming
    HostedChatCompletion,
    /// Job-style API: submit a prediction, then follow its event stream
    HostedRawCompletion,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostedChatCompletion => write!(f, "hosted-chat-completion"),
            Self::HostedRawCompletion => write!(f, "hosted-raw-completion"),
        }
    }
}

/// One selectable model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    // @field: Stable identifier sent by clients
    pub id: u32,

    // @field: Protocol used to reach the model
    pub backend_kind: BackendKind,

    // @field: Label for model pickers
    pub display_name: &'static str,

    // @field: Model name or version hash understood by the backend
    #[serde(skip)]
    pub model_identifier: &'static str,

    // @field: Sampling temperature
    #[serde(skip)]
    pub temperature: f32,

    // @field: Upper bound on generated tokens
    #[serde(skip)]
    pub max_output_tokens: u32,
}

static MODEL_CONFIGS: [ModelConfig; 3] = [
    ModelConfig {
        id: 1,
        backend_kind: BackendKind::HostedChatCompletion,
        display_name: "GPT-4 (default model)",
        model_identifier: "gpt-4",
        temperature: 0.3,
        max_output_tokens: 2000,
    },
    ModelConfig {
        id: 2,
        backend_kind: BackendKind::HostedChatCompletion,
        display_name: "GPT-3.5",
        model_identifier: "gpt-3.5-turbo",
        temperature: 0.3,
        max_output_tokens: 2000,
    },
    ModelConfig {
        id: 3,
        backend_kind: BackendKind::HostedRawCompletion,
        display_name: "Llama 2 70B (can be slow)",
        // meta/llama-2-70b-chat
        model_identifier: "2796ee9483c3fd7aa2e171d38f4ca12251a30609463dcfd4cd76703f22e96cdf",
        temperature: 0.5,
        max_output_tokens: 2000,
    },
];

/// Id of the model selected when a client does not choose one
pub const DEFAULT_MODEL_CONFIG_ID: u32 = 1;

/// Find the model configuration with the given id
pub fn lookup(id: i64) -> Option<&'static ModelConfig> {
    let id = u32::try_from(id).ok()?;
    MODEL_CONFIGS.iter().find(|config| config.id == id)
}

/// The whole catalog, ordered by id
pub fn all() -> &'static [ModelConfig] {
    &MODEL_CONFIGS
}
