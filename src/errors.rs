/*!
 * Error types for the gagana application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Message shown to users when a model configuration cannot be resolved
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Sorry, something went wrong when trying to access that AI model. Please try another model. If you continue to have problems, please contact us.";

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend reported a failure after output had started
    #[error("Backend stream failed: {0}")]
    StreamFailed(String),

    /// The backend closed its stream without signalling completion
    #[error("Backend stream interrupted: {0}")]
    StreamInterrupted(String),

    /// No event arrived from the backend within the idle window
    #[error("No output from backend for {0} seconds")]
    IdleTimeout(u64),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching error variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors produced by the streaming relay
///
/// Everything except `BackendStream` is detected before the response
/// headers are sent and can therefore be reported with a status code.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The requested model configuration does not exist or has no backend
    #[error("Unknown model configuration: {0}")]
    ConfigNotFound(i64),

    /// Malformed body, unknown translate mode or out-of-bounds input
    #[error("Invalid translation request: {0}")]
    Validation(String),

    /// The backend rejected the call before any output was produced
    #[error("Backend rejected the request: {0}")]
    BackendDispatch(#[source] ProviderError),

    /// The backend failed after streaming began
    #[error("Backend failed while streaming: {0}")]
    BackendStream(#[source] ProviderError),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Message suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigNotFound(_) => MODEL_UNAVAILABLE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error happened before any output was streamed
    pub fn is_pre_stream(&self) -> bool {
        !matches!(self, Self::BackendStream(_))
    }
}

/// Errors returned by the translation store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record carries the given transaction id
    #[error("Translation not found: {0}")]
    NotFound(String),

    /// The underlying database failed
    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Error type of the command-line front end
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file or terminal operation
    #[error("File error: {0}")]
    File(String),

    /// Error in the configuration or command-line options
    #[error("Configuration error: {0}")]
    Config(String),

    /// The translation did not complete
    #[error("Translation failed: {0}")]
    Translation(String),

    /// Error from the persistence layer
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        Self::Persistence(error.to_string())
    }
}
