/*!
 * Client-side translation session.
 *
 * This module handles:
 * - Consuming a relay stream and buffering its fragments
 * - Storing the finished translation
 * - Submitting feedback at most once per stored translation
 */

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::database::{Feedback, NewTranslationRecord, TranslationStore};
use crate::errors::RelayError;
use crate::language_utils::TranslateMode;
use crate::model_config::DEFAULT_MODEL_CONFIG_ID;
use crate::relay::{StreamingRelay, TranslationRequest};

use super::models::{ERROR_NOTICE, SessionOutcome};

/// State of one user's translation form
///
/// Running a translation borrows the session mutably, so a second run
/// cannot start while one is in flight.
pub struct TranslationSession {
    /// Where finished translations are stored
    store: Arc<dyn TranslationStore>,
    /// User recorded with each translation
    user_id: String,
    /// Selected direction
    translate_mode: TranslateMode,
    /// Text to translate
    input: String,
    /// Selected model
    model_config_id: i64,
    /// Output received so far
    results: String,
    /// Id of the stored record for the last completed translation
    transaction_id: Option<String>,
    /// Whether feedback was already sent for that record
    feedback_submitted: bool,
}

impl TranslationSession {
    /// Create an empty session for `user_id`
    pub fn new(store: Arc<dyn TranslationStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            translate_mode: TranslateMode::EnToSm,
            input: String::new(),
            model_config_id: i64::from(DEFAULT_MODEL_CONFIG_ID),
            results: String::new(),
            transaction_id: None,
            feedback_submitted: false,
        }
    }

    pub fn set_translate_mode(&mut self, mode: TranslateMode) {
        self.translate_mode = mode;
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn set_model_config_id(&mut self, id: i64) {
        self.model_config_id = id;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn results(&self) -> &str {
        &self.results
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Whether a feedback button should be enabled
    pub fn can_submit_feedback(&self) -> bool {
        self.transaction_id.is_some() && !self.feedback_submitted
    }

    /// Request body for the current form state
    pub fn request(&self) -> TranslationRequest {
        TranslationRequest::new(self.translate_mode.as_str(), self.input.clone(), self.model_config_id)
    }

    /// Dispatch the current form through `relay` and consume the result
    pub async fn translate<F>(&mut self, relay: &StreamingRelay, on_fragment: F) -> SessionOutcome
    where
        F: FnMut(&str),
    {
        match relay.dispatch(self.request()).await {
            Ok(stream) => self.run(stream, on_fragment).await,
            Err(e) => {
                self.reset_output();
                let notice = match &e {
                    RelayError::ConfigNotFound(_) | RelayError::Validation(_) => e.user_message(),
                    _ => ERROR_NOTICE.to_string(),
                };
                SessionOutcome::failed(notice)
            }
        }
    }

    /// Consume a relay stream
    ///
    /// Fragments are appended in arrival order and reported to `on_fragment`.
    /// On a clean end the translation is stored; a storage failure is logged
    /// and the outcome is still `Completed`, only without a transaction id.
    /// On a stream error the partial output is discarded.
    pub async fn run<S, F>(&mut self, mut stream: S, mut on_fragment: F) -> SessionOutcome
    where
        S: Stream<Item = Result<String, RelayError>> + Unpin,
        F: FnMut(&str),
    {
        self.reset_output();

        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    on_fragment(&fragment);
                    self.results.push_str(&fragment);
                }
                Err(e) => {
                    warn!("Translation stream failed: {}", e);
                    self.results.clear();
                    return SessionOutcome::failed(ERROR_NOTICE);
                }
            }
        }

        let (source, target) = self.translate_mode.languages();
        let record = NewTranslationRecord {
            user_id: self.user_id.clone(),
            model_config_id: self.model_config_id,
            prompt: self.input.clone(),
            source_lang: source.code().to_string(),
            target_lang: target.code().to_string(),
            response: self.results.clone(),
        };

        match self.store.create_translation(record).await {
            Ok(transaction_id) => {
                info!("Stored translation {}", transaction_id);
                self.transaction_id = Some(transaction_id.clone());
                SessionOutcome::Completed {
                    text: self.results.clone(),
                    transaction_id: Some(transaction_id),
                }
            }
            Err(e) => {
                warn!("Failed to store translation: {}", e);
                SessionOutcome::Completed {
                    text: self.results.clone(),
                    transaction_id: None,
                }
            }
        }
    }

    /// Send feedback for the last stored translation
    ///
    /// Returns the handle of the background update, or `None` when there is
    /// nothing to rate or feedback was already sent. Update failures are
    /// only logged.
    pub fn submit_feedback(&mut self, feedback: Feedback) -> Option<JoinHandle<()>> {
        if !self.can_submit_feedback() {
            debug!("Ignoring {} feedback: nothing to rate", feedback);
            return None;
        }
        let transaction_id = self.transaction_id.clone()?;
        self.feedback_submitted = true;

        let store = self.store.clone();
        Some(tokio::spawn(async move {
            match store.update_feedback(&transaction_id, feedback).await {
                Ok(()) => debug!("Recorded {} for {}", feedback, transaction_id),
                Err(e) => warn!("Failed to record feedback for {}: {}", transaction_id, e),
            }
        }))
    }

    /// Reset the form
    pub fn clear(&mut self) {
        self.input.clear();
        self.reset_output();
    }

    fn reset_output(&mut self) {
        self.results.clear();
        self.transaction_id = None;
        self.feedback_submitted = false;
    }
}
