use anyhow::{Result, anyhow};
use isolang::Language as IsoLanguage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language utilities for the supported translation pairs
///
/// This module maps the closed set of translate modes onto concrete
/// source/target languages and resolves ISO 639-1 codes to display names.

/// Languages the service translates between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Samoan,
    Chamorro,
}

impl Language {
    /// ISO 639-1 code stored with persisted translations
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Samoan => "sm",
            Self::Chamorro => "ch",
        }
    }

    /// English name of the language, as used in prompts
    pub fn name(self) -> &'static str {
        IsoLanguage::from_639_1(self.code())
            .map(|lang| lang.to_name())
            .unwrap_or(self.code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Direction of a translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslateMode {
    EnToSm,
    SmToEn,
    EnToCh,
    ChToEn,
}

impl TranslateMode {
    /// Every supported mode
    pub const ALL: [TranslateMode; 4] = [
        TranslateMode::EnToSm,
        TranslateMode::SmToEn,
        TranslateMode::EnToCh,
        TranslateMode::ChToEn,
    ];

    /// Source and target language for this mode
    pub fn languages(self) -> (Language, Language) {
        match self {
            Self::EnToSm => (Language::English, Language::Samoan),
            Self::SmToEn => (Language::Samoan, Language::English),
            Self::EnToCh => (Language::English, Language::Chamorro),
            Self::ChToEn => (Language::Chamorro, Language::English),
        }
    }

    pub fn source(self) -> Language {
        self.languages().0
    }

    pub fn target(self) -> Language {
        self.languages().1
    }

    /// Canonical wire name of the mode
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnToSm => "enToSm",
            Self::SmToEn => "smToEn",
            Self::EnToCh => "enToCh",
            Self::ChToEn => "chToEn",
        }
    }
}

impl fmt::Display for TranslateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TranslateMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // Legacy UI values only ever meant the Samoan pair
        match s.trim().to_lowercase().as_str() {
            "entosm" | "englishtosamoan" | "tosamoan" => Ok(Self::EnToSm),
            "smtoen" | "samoantoenglish" | "toenglish" => Ok(Self::SmToEn),
            "entoch" | "englishtochamorro" => Ok(Self::EnToCh),
            "chtoen" | "chamorrotoenglish" => Ok(Self::ChToEn),
            _ => Err(anyhow!("Unsupported translate mode: {}", s)),
        }
    }
}
