/*!
 * Database module for persistent storage of translation records.
 *
 * This module provides SQLite-based persistence for:
 * - One record per completed translation
 * - Feedback updates on those records
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{Feedback, NewTranslationRecord, TranslationRecord};
pub use repository::{Repository, TranslationStore};
