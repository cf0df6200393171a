//! Persistence of story inputs and run artifacts.

use async_trait::async_trait;
use fabula_core::{BeatSheet, Chapter, CharacterRoster, SceneReview, StoryProfile};
use fabula_error::FabulaResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Author-supplied inputs for a run, as loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StorySource {
    seed: String,
    beats: Vec<String>,
    language: Option<String>,
}

impl StorySource {
    /// Create a story source.
    pub fn new(seed: impl Into<String>, beats: Vec<String>, language: Option<String>) -> Self {
        Self {
            seed: seed.into(),
            beats,
            language,
        }
    }
}

/// Storage for one story's inputs and generated artifacts.
///
/// A repository instance is bound to a single story.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Load the seed text and raw beat entries.
    async fn load_source(&self) -> FabulaResult<StorySource>;

    /// Persist a finished chapter along with the beats it covers.
    async fn save_chapter(&self, chapter: &Chapter, beats: &BeatSheet) -> FabulaResult<()> {
        self.save_reviewed_chapter(chapter, beats, &BTreeMap::new())
            .await
    }

    /// Persist a finished chapter with the style reviews of its scenes.
    ///
    /// `reviews` is keyed by beat index; entries for beats outside the
    /// chapter are ignored.
    async fn save_reviewed_chapter(
        &self,
        chapter: &Chapter,
        beats: &BeatSheet,
        reviews: &BTreeMap<usize, SceneReview>,
    ) -> FabulaResult<()>;

    /// Load a previously saved chapter.
    async fn load_chapter(&self, number: usize) -> FabulaResult<Chapter>;

    /// Saved chapter numbers in ascending order.
    async fn list_chapters(&self) -> FabulaResult<Vec<usize>>;

    /// Persist the analyzed story profile.
    async fn save_profile(&self, profile: &StoryProfile) -> FabulaResult<()>;

    /// Load the story profile, if one was saved.
    async fn load_profile(&self) -> FabulaResult<Option<StoryProfile>>;

    /// Load the persisted character roster (empty if none).
    async fn load_characters(&self) -> FabulaResult<CharacterRoster>;

    /// Merge a roster into the persisted one and return the result.
    async fn merge_characters(&self, roster: &CharacterRoster) -> FabulaResult<CharacterRoster>;

    /// Remove every generated artifact (chapters, profile, characters) so a
    /// fresh run starts clean. The seed and beats are kept.
    async fn reset(&self) -> FabulaResult<()>;

    /// Related character names for each persisted character.
    async fn character_network(&self) -> FabulaResult<BTreeMap<String, Vec<String>>> {
        Ok(self.load_characters().await?.network())
    }
}
