/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for translation records,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::StoreError;

use super::connection::DatabaseConnection;
use super::models::{Feedback, NewTranslationRecord, TranslationRecord};

/// Persistence gateway used by the session controller and the HTTP layer
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Store a finished translation and return its generated transaction id
    async fn create_translation(&self, record: NewTranslationRecord) -> Result<String, StoreError>;

    /// Attach feedback to an existing translation
    async fn update_feedback(&self, transaction_id: &str, feedback: Feedback) -> Result<(), StoreError>;

    /// Fetch a translation by transaction id
    async fn get_translation(&self, transaction_id: &str) -> Result<Option<TranslationRecord>, StoreError>;
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Insert a translation record
    pub async fn insert_translation(&self, record: &TranslationRecord) -> Result<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (
                        transaction_id, user_id, model_config_id, prompt, source_lang,
                        target_lang, response, feedback_state, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        record.transaction_id,
                        record.user_id,
                        record.model_config_id,
                        record.prompt,
                        record.source_lang,
                        record.target_lang,
                        record.response,
                        record.feedback_state.map(|f| f.to_string()),
                        record.created_at,
                        record.updated_at,
                    ],
                )?;
                debug!("Stored translation {}", record.transaction_id);
                Ok(())
            })
            .await
    }

    /// Get a translation by transaction id
    pub async fn find_translation(&self, transaction_id: &str) -> Result<Option<TranslationRecord>> {
        let transaction_id = transaction_id.to_string();

        self.db
            .execute_async(move |conn| Self::find_translation_sync(conn, &transaction_id))
            .await
    }

    fn find_translation_sync(conn: &Connection, transaction_id: &str) -> Result<Option<TranslationRecord>> {
        let result = conn
            .query_row(
                r#"
                SELECT transaction_id, user_id, model_config_id, prompt, source_lang,
                       target_lang, response, feedback_state, created_at, updated_at
                FROM translations WHERE transaction_id = ?1
                "#,
                [transaction_id],
                |row| {
                    Ok(TranslationRecord {
                        transaction_id: row.get(0)?,
                        user_id: row.get(1)?,
                        model_config_id: row.get(2)?,
                        prompt: row.get(3)?,
                        source_lang: row.get(4)?,
                        target_lang: row.get(5)?,
                        response: row.get(6)?,
                        feedback_state: row
                            .get::<_, Option<String>>(7)?
                            .and_then(|s| s.parse().ok()),
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Set the feedback of a translation
    ///
    /// Returns the number of matched rows: 0 when the id is unknown.
    pub async fn set_feedback(&self, transaction_id: &str, feedback: Feedback) -> Result<usize> {
        let transaction_id = transaction_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE translations SET feedback_state = ?1, updated_at = ?2 WHERE transaction_id = ?3",
                    params![feedback.to_string(), now, transaction_id],
                )?;
                Ok(updated)
            })
            .await
    }
}

#[async_trait]
impl TranslationStore for Repository {
    async fn create_translation(&self, record: NewTranslationRecord) -> Result<String, StoreError> {
        let transaction_id = uuid::Uuid::new_v4().to_string();
        let record = TranslationRecord::new(transaction_id.clone(), record);
        self.insert_translation(&record).await?;
        Ok(transaction_id)
    }

    async fn update_feedback(&self, transaction_id: &str, feedback: Feedback) -> Result<(), StoreError> {
        match self.set_feedback(transaction_id, feedback).await? {
            0 => Err(StoreError::NotFound(transaction_id.to_string())),
            _ => Ok(()),
        }
    }

    async fn get_translation(&self, transaction_id: &str) -> Result<Option<TranslationRecord>, StoreError> {
        Ok(self.find_translation(transaction_id).await?)
    }
}
