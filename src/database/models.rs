/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality feedback attached to a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// The translation was good
    Upvote,
    /// The translation was poor
    Downvote,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Upvote => write!(f, "upvote"),
            Feedback::Downvote => write!(f, "downvote"),
        }
    }
}

impl std::str::FromStr for Feedback {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upvote" => Ok(Feedback::Upvote),
            "downvote" => Ok(Feedback::Downvote),
            _ => Err(anyhow::anyhow!("Invalid feedback: {}", s)),
        }
    }
}

/// Fields supplied by the caller when recording a finished translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTranslationRecord {
    /// Identifier of the submitting user
    pub user_id: String,
    /// Catalog id of the model that produced the response
    pub model_config_id: i64,
    /// Text submitted for translation
    pub prompt: String,
    /// Source language code
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Full translated output
    pub response: String,
}

/// Persisted translation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    /// Unique identifier assigned on insert (UUID)
    pub transaction_id: String,
    /// Identifier of the submitting user
    pub user_id: String,
    /// Catalog id of the model that produced the response
    pub model_config_id: i64,
    /// Text submitted for translation
    pub prompt: String,
    /// Source language code
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Full translated output
    pub response: String,
    /// Feedback, if any was given
    pub feedback_state: Option<Feedback>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl TranslationRecord {
    /// Build a fresh record from caller fields
    pub fn new(transaction_id: String, record: NewTranslationRecord) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            transaction_id,
            user_id: record.user_id,
            model_config_id: record.model_config_id,
            prompt: record.prompt,
            source_lang: record.source_lang,
            target_lang: record.target_lang,
            response: record.response,
            feedback_state: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
