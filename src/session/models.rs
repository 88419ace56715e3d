/*!
 * Session-specific models.
 *
 * Outcomes reported by the session controller to whatever renders it.
 */

use serde::Serialize;

/// Notice shown when a translation breaks off
pub const ERROR_NOTICE: &str = "An error has occurred. Please try again.";

/// How a translation attempt ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionOutcome {
    /// The stream ended cleanly
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Full translated text
        text: String,
        /// Id of the stored record, absent when storing failed
        transaction_id: Option<String>,
    },
    /// The request was refused or the stream broke off; partial output is discarded
    Failed {
        /// Message for the user
        notice: String,
    },
}

impl SessionOutcome {
    pub fn failed(notice: impl Into<String>) -> Self {
        Self::Failed { notice: notice.into() }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Transaction id available for feedback
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::Completed { transaction_id, .. } => transaction_id.as_deref(),
            Self::Failed { .. } => None,
        }
    }
}
