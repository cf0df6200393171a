//! Language codes and narrative voice hints.

use fabula_error::{StoryError, StoryErrorKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// A language the pipeline can write in.
///
/// # Examples
///
/// ```
/// use fabula_core::Language;
/// use std::str::FromStr;
///
/// assert_eq!(Language::from_str("ja").unwrap(), Language::Ja);
/// assert_eq!(Language::Ja.to_string(), "ja");
/// assert_eq!(Language::Ja.name(), "Japanese");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// Chinese
    Zh,
    /// Japanese
    Ja,
    /// Korean
    Ko,
    /// Spanish
    Es,
    /// French
    Fr,
    /// German
    De,
}

impl Language {
    /// English name used inside prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "Chinese",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
        }
    }

    /// Comma-separated list of supported codes.
    pub fn supported_codes() -> String {
        Language::iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Language requested for a run: detect from the seed, or use a fixed code.
///
/// Parsing rejects anything outside the supported set with a
/// `Configuration` error so bad input fails before any generation.
///
/// # Examples
///
/// ```
/// use fabula_core::{Language, LanguageSelection};
///
/// assert_eq!("auto".parse::<LanguageSelection>().unwrap(), LanguageSelection::Auto);
/// assert_eq!(
///     "FR".parse::<LanguageSelection>().unwrap(),
///     LanguageSelection::Explicit(Language::Fr)
/// );
/// assert!("xx".parse::<LanguageSelection>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LanguageSelection {
    /// Infer the language from the seed text
    #[default]
    Auto,
    /// Use this language regardless of the seed
    Explicit(Language),
}

impl FromStr for LanguageSelection {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.eq_ignore_ascii_case("auto") {
            return Ok(LanguageSelection::Auto);
        }
        Language::from_str(code)
            .map(LanguageSelection::Explicit)
            .map_err(|_| {
                StoryError::new(StoryErrorKind::Configuration(format!(
                    "unsupported language '{}'; expected 'auto' or one of: {}",
                    code,
                    Language::supported_codes()
                )))
            })
    }
}

impl TryFrom<String> for LanguageSelection {
    type Error = StoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageSelection> for String {
    fn from(value: LanguageSelection) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for LanguageSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageSelection::Auto => write!(f, "auto"),
            LanguageSelection::Explicit(lang) => write!(f, "{}", lang),
        }
    }
}

/// Grammatical person of the narration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Pov {
    /// "I walked"
    #[display("first person")]
    FirstPerson,
    /// "You walk"
    #[display("second person")]
    SecondPerson,
    /// "She walked"
    #[default]
    #[display("third person")]
    ThirdPerson,
}

/// Narrative tense.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Tense {
    /// Past tense
    #[default]
    #[display("past")]
    Past,
    /// Present tense
    #[display("present")]
    Present,
}

/// Resolved language plus advisory voice hints for a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct StyleHints {
    language: Language,
    pov: Pov,
    tense: Tense,
}

impl StyleHints {
    /// Create style hints.
    pub fn new(language: Language, pov: Pov, tense: Tense) -> Self {
        Self {
            language,
            pov,
            tense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_round_trips_through_serde() {
        let json = serde_json::to_string(&LanguageSelection::Explicit(Language::De)).unwrap();
        assert_eq!(json, "\"de\"");
        let back: LanguageSelection = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(back, LanguageSelection::Auto);
    }

    #[test]
    fn unsupported_code_is_configuration_error() {
        let err = "klingon".parse::<LanguageSelection>().unwrap_err();
        assert!(matches!(err.kind, StoryErrorKind::Configuration(_)));
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn supported_codes_lists_all_seven() {
        assert_eq!(Language::supported_codes(), "en, zh, ja, ko, es, fr, de");
    }
}
