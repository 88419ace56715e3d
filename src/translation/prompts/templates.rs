/*!
 * Prompt templates for translation requests.
 *
 * Chat-style backends get the instruction as a system message; job-style
 * backends get it as a separate `system_prompt` string next to the text.
 */

/// System prompt template with language placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// Instruction used with chat completion models.
    pub const CHAT_TRANSLATOR: &'static str = "You are a language translator that translates {source_language} to {target_language} as precisely as possible. Even though you do not know Samoan or Chamorro very well, you do your best when one of these is a target language. Please only respond with the translated text. No commentary is requested or desired. Thank you.";

    /// Instruction used with raw completion models.
    pub const RAW_TRANSLATOR: &'static str = "You are a professional translator. You always translate {source_language} to {target_language}. Even if you are not comfortable with your Samoan or Chamorro language skills, you do your very best. Please only respond with the translated text. No commentary is requested or desired. Thank you.";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn chat_translator() -> Self {
        Self::new(Self::CHAT_TRANSLATOR)
    }

    pub fn raw_translator() -> Self {
        Self::new(Self::RAW_TRANSLATOR)
    }

    /// Render the template with the given language names.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::chat_translator()
    }
}
