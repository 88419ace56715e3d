/*!
 * # Gagana - streaming translation relay
 *
 * A Rust library and service for translating between English and Samoan or
 * Chamorro with hosted large language models.
 *
 * ## Features
 *
 * - Fixed catalog of selectable models
 * - Translation through hosted model APIs:
 *   - OpenAI chat completions
 *   - Replicate predictions
 * - Token-by-token relay to the caller as server-sent events
 * - SQLite persistence of translations and their feedback
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `model_config`: Static model catalog
 * - `translation`: Translation jobs and prompt templates
 * - `providers`: Backend adapters for hosted model APIs:
 *   - `providers::openai`: OpenAI streaming client
 *   - `providers::replicate`: Replicate prediction client
 *   - `providers::sse`: Incremental server-sent event decoder
 * - `relay`: Request validation, dispatch and stream forwarding
 * - `server`: HTTP endpoints
 * - `session`: Client-side translation form state
 * - `database`: Translation record storage
 * - `language_utils`: Supported languages and translate modes
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod model_config;
pub mod providers;
pub mod relay;
pub mod server;
pub mod session;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError, RelayError, StoreError};
pub use language_utils::{Language, TranslateMode};
pub use model_config::{BackendKind, ModelConfig};
pub use relay::{StreamingRelay, TranslationRequest};
pub use session::{SessionOutcome, TranslationSession};
