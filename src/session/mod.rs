/*!
 * Client session module for interactive translation.
 *
 * This module provides:
 * - Explicit per-user form state (`TranslationSession`)
 * - Consumption of relay streams with persistence on completion
 * - One-shot feedback submission
 */

pub mod controller;
pub mod models;

// Re-export main types
pub use controller::TranslationSession;
pub use models::{ERROR_NOTICE, SessionOutcome};
