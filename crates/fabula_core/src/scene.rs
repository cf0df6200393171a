//! Generated scenes and assembled chapters.

use crate::Language;
use serde::{Deserialize, Serialize};

/// Prose produced for a single beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct GeneratedScene {
    beat_index: usize,
    language: Language,
    text: String,
}

impl GeneratedScene {
    /// Create a scene.
    pub fn new(beat_index: usize, language: Language, text: impl Into<String>) -> Self {
        Self {
            beat_index,
            language,
            text: text.into(),
        }
    }

    /// Consume the scene, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// An ordered run of scenes joined by the scene separator.
///
/// # Examples
///
/// ```
/// use fabula_core::{Chapter, Language};
///
/// let chapter = Chapter::new(1, Some("Landfall".into()), Language::En, vec![1, 2], "a\n\n---\n\nb");
/// assert_eq!(chapter.heading(), "Chapter 1: Landfall");
/// assert_eq!(chapter.beat_indices(), &vec![1, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Chapter {
    number: usize,
    title: Option<String>,
    language: Language,
    beat_indices: Vec<usize>,
    text: String,
}

impl Chapter {
    /// Create a chapter.
    pub fn new(
        number: usize,
        title: Option<String>,
        language: Language,
        beat_indices: Vec<usize>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            number,
            title,
            language,
            beat_indices,
            text: text.into(),
        }
    }

    /// Display heading, e.g. `Chapter 3: The Storm`.
    pub fn heading(&self) -> String {
        match &self.title {
            Some(title) => format!("Chapter {}: {}", self.number, title),
            None => format!("Chapter {}", self.number),
        }
    }
}

/// An editor's reading of one generated scene.
///
/// Advisory only: reviews are stored alongside chapter metadata and never
/// feed back into later expansions.
///
/// # Examples
///
/// ```
/// use fabula_core::SceneReview;
///
/// let review: SceneReview = serde_json::from_str(
///     r#"{"tone": "tense", "narrative_voice": "close third", "pacing": "brisk"}"#,
/// )
/// .unwrap();
/// assert_eq!(review.tone(), "tense");
/// assert!(review.suggestions().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SceneReview {
    tone: String,
    narrative_voice: String,
    pacing: String,
    #[serde(default)]
    character_consistency: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

impl SceneReview {
    /// Create a review with no strengths or suggestions.
    pub fn new(
        tone: impl Into<String>,
        narrative_voice: impl Into<String>,
        pacing: impl Into<String>,
    ) -> Self {
        Self {
            tone: tone.into(),
            narrative_voice: narrative_voice.into(),
            pacing: pacing.into(),
            character_consistency: String::new(),
            strengths: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Attach the consistency note, strengths, and suggestions.
    pub fn with_notes(
        mut self,
        character_consistency: impl Into<String>,
        strengths: Vec<String>,
        suggestions: Vec<String>,
    ) -> Self {
        self.character_consistency = character_consistency.into();
        self.strengths = strengths;
        self.suggestions = suggestions;
        self
    }
}
