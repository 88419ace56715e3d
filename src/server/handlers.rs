//! Request handlers for the relay and persistence endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::database::{Feedback, NewTranslationRecord};
use crate::errors::{RelayError, StoreError};
use crate::model_config::{self, ModelConfig};

use super::AppState;

/// Body of `POST /api/translations`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTranslationBody {
    #[serde(default)]
    pub user_id: Option<String>,
    pub model_config_id: i64,
    pub prompt: String,
    pub source_lang: String,
    pub target_lang: String,
    pub response: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTranslation {
    pub transaction_id: String,
}

/// Body of `PUT /api/translations/:transaction_id/feedback`
#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub feedback: Feedback,
}

/// JSON `{"error": message}` response
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl RelayError {
    /// Status code used when the error is reported before streaming
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::ConfigNotFound(_) | RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::BackendDispatch(_) => StatusCode::FAILED_DEPENDENCY,
            RelayError::BackendStream(_) => StatusCode::BAD_GATEWAY,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.user_message())
    }
}

/// Liveness probe endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Model catalog for pickers.
pub async fn list_models() -> Json<&'static [ModelConfig]> {
    Json(model_config::all())
}

/// Relay a translation as a server-sent event stream.
///
/// Each fragment becomes one `data:` event. A backend failure after the
/// headers were sent aborts the body instead of closing it cleanly.
pub async fn translate(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.relay().relay_body(&body).await {
        Ok(fragments) => {
            let events = fragments.map(|item| item.map(|fragment| Event::default().data(normalize_newlines(&fragment))));
            Sse::new(events).keep_alive(KeepAlive::default()).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Store a finished translation.
pub async fn create_translation(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body: CreateTranslationBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Malformed request body: {}", e)),
    };

    let record = NewTranslationRecord {
        user_id: body
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| state.default_user_id().to_string()),
        model_config_id: body.model_config_id,
        prompt: body.prompt,
        source_lang: body.source_lang,
        target_lang: body.target_lang,
        response: body.response,
    };

    match state.store().create_translation(record).await {
        Ok(transaction_id) => (StatusCode::CREATED, Json(CreatedTranslation { transaction_id })).into_response(),
        Err(e) => {
            error!("Failed to store translation: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Attach feedback to a stored translation.
pub async fn update_feedback(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
    body: Bytes,
) -> Response {
    let body: FeedbackBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Malformed feedback: {}", e)),
    };

    match state.store().update_feedback(&transaction_id, body.feedback).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(StoreError::NotFound(id)) => {
            warn!("Feedback for unknown translation {}", id);
            error_response(StatusCode::NOT_FOUND, format!("Translation not found: {}", id))
        }
        Err(e) => {
            error!("Failed to update feedback for {}: {}", transaction_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// SSE data lines split on LF only
fn normalize_newlines(fragment: &str) -> String {
    if fragment.contains('\r') {
        fragment.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        fragment.to_string()
    }
}
