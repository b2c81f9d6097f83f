//! Closed enumeration of supported languages
//!
//! Any language string arriving from a request is resolved here before it
//! reaches the store. Resolution is case-insensitive and accepts either the
//! enumeration name (`"Swahili"`) or the two-letter code (`"sw"`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported source/target languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    Bulgarian,
    Gujarati,
    Swahili,
    Turkish,
    English,
}

/// Form option for language selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOption {
    pub display_name: String,
    pub language: String,
}

impl Language {
    /// Every member in declaration order
    pub const ALL: [Language; 5] = [
        Language::Bulgarian,
        Language::Gujarati,
        Language::Swahili,
        Language::Turkish,
        Language::English,
    ];

    /// Resolve a user-supplied language string, case-insensitively
    pub fn resolve(value: &str) -> Option<Language> {
        let value = value.trim();
        Self::ALL.into_iter().find(|language| {
            language.name().eq_ignore_ascii_case(value) || language.code().eq_ignore_ascii_case(value)
        })
    }

    /// Enumeration name, e.g. `SWAHILI`
    pub fn name(&self) -> &'static str {
        match self {
            Language::Bulgarian => "BULGARIAN",
            Language::Gujarati => "GUJARATI",
            Language::Swahili => "SWAHILI",
            Language::Turkish => "TURKISH",
            Language::English => "ENGLISH",
        }
    }

    /// Lowercase two-letter code, e.g. `sw`
    pub fn code(&self) -> &'static str {
        match self {
            Language::Bulgarian => "bg",
            Language::Gujarati => "gu",
            Language::Swahili => "sw",
            Language::Turkish => "tr",
            Language::English => "en",
        }
    }

    /// Uppercase code as persisted in language columns, e.g. `SW`
    pub fn stored_code(&self) -> String {
        self.code().to_uppercase()
    }

    /// Human-readable name, e.g. `Swahili`
    pub fn display_name(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for every supported language, in enumeration order
pub fn language_options() -> Vec<LanguageOption> {
    Language::ALL
        .iter()
        .map(|language| LanguageOption {
            display_name: language.display_name(),
            language: language.name().to_string(),
        })
        .collect()
}
