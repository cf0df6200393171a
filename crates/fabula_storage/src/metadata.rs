//! On-disk records that sit beside the prose.

use chrono::{DateTime, Utc};
use fabula_core::{BeatSheet, Chapter, Language, SceneReview};
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Contents of `beats.toml`.
///
/// # Examples
///
/// ```
/// use fabula_storage::BeatsFile;
///
/// let file: BeatsFile = toml::from_str(r##"
/// language = "fr"
/// beats = ["# Arrivée", "Elle trouve la lettre"]
/// "##).unwrap();
/// assert_eq!(file.beats.len(), 2);
/// assert_eq!(file.language.as_deref(), Some("fr"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatsFile {
    /// Raw beat entries, including chapter markers
    pub beats: Vec<String>,
    /// Optional language code for the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One scene's entry in the chapter record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SceneMetadata {
    beat_index: usize,
    beat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style_analysis: Option<SceneReview>,
}

/// Sidecar record saved next to each chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ChapterMetadata {
    number: usize,
    title: Option<String>,
    beat_indices: Vec<usize>,
    beats: Vec<String>,
    language: Language,
    created_at: DateTime<Utc>,
    #[serde(default)]
    scenes: Vec<SceneMetadata>,
}

impl ChapterMetadata {
    /// Describe `chapter`, copying the text of the beats it covers.
    pub fn describe(chapter: &Chapter, sheet: &BeatSheet) -> Self {
        Self::reviewed(chapter, sheet, &BTreeMap::new())
    }

    /// Describe `chapter` with the style review of each scene that has one.
    pub fn reviewed(
        chapter: &Chapter,
        sheet: &BeatSheet,
        reviews: &BTreeMap<usize, SceneReview>,
    ) -> Self {
        let scenes: Vec<SceneMetadata> = chapter
            .beat_indices()
            .iter()
            .filter_map(|&i| sheet.get(i))
            .map(|beat| SceneMetadata {
                beat_index: *beat.index(),
                beat: beat.text().clone(),
                style_analysis: reviews.get(beat.index()).cloned(),
            })
            .collect();
        Self {
            number: *chapter.number(),
            title: chapter.title().clone(),
            beat_indices: chapter.beat_indices().clone(),
            beats: scenes.iter().map(|scene| scene.beat.clone()).collect(),
            language: *chapter.language(),
            created_at: Utc::now(),
            scenes,
        }
    }

    /// Rebuild the chapter from this record and its prose.
    pub fn into_chapter(self, text: String) -> Chapter {
        Chapter::new(
            self.number,
            self.title,
            self.language,
            self.beat_indices,
            text,
        )
    }
}
