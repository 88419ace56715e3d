/*!
 * Translation jobs and their prompts.
 *
 * A `TranslationJob` is the validated, backend-independent description of
 * one translation: direction, resolved languages and the text itself.
 * Backend adapters turn it into their own request shapes.
 */

use crate::language_utils::{Language, TranslateMode};

pub use self::prompts::PromptTemplate;

pub mod prompts;

/// Validated translation work handed to a backend adapter
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationJob {
    // @field: Requested direction
    pub mode: TranslateMode,
    // @field: Language of the input text
    pub source: Language,
    // @field: Language to produce
    pub target: Language,
    // @field: Raw user input
    pub text: String,
}

impl TranslationJob {
    pub fn new(mode: TranslateMode, text: impl Into<String>) -> Self {
        let (source, target) = mode.languages();
        Self {
            mode,
            source,
            target,
            text: text.into(),
        }
    }

    /// System instruction rendered for this job's languages
    pub fn system_prompt(&self, template: &PromptTemplate) -> String {
        template.render(self.source.name(), self.target.name())
    }
}
