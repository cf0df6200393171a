//! Story directory backed by the local filesystem.

use crate::{BeatsFile, ChapterMetadata};
use async_trait::async_trait;
use fabula_core::{BeatSheet, Chapter, CharacterRoster, SceneReview, StoryProfile};
use fabula_error::{FabulaResult, StorageError, StorageErrorKind};
use fabula_interface::{StoryRepository, StorySource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SEED_FILE: &str = "story.md";
const BEATS_FILE: &str = "beats.toml";
const PROFILE_FILE: &str = "story_profile.json";
const CHARACTERS_FILE: &str = "character_profiles.json";
const CHAPTERS_DIR: &str = "chapters";

/// Story repository rooted at one story directory.
///
/// # Features
///
/// - **Plain files**: prose as markdown, records as pretty JSON
/// - **Atomic writes**: temp file + rename, so a crash never leaves half a chapter
/// - **Merging roster**: saved characters merge into what is already on disk
#[derive(Debug, Clone)]
pub struct FilesystemStoryRepository {
    root: PathBuf,
}

impl FilesystemStoryRepository {
    /// Bind to a story directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The story directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chapters_dir(&self) -> PathBuf {
        self.root.join(CHAPTERS_DIR)
    }

    fn chapter_path(&self, number: usize) -> PathBuf {
        self.chapters_dir().join(format!("chapter_{}.md", number))
    }

    fn metadata_path(&self, number: usize) -> PathBuf {
        self.chapters_dir()
            .join(format!("chapter_{}_metadata.json", number))
    }

    /// Parse a chapter number out of `chapter_{n}.md`.
    fn chapter_number(file_name: &str) -> Option<usize> {
        file_name
            .strip_prefix("chapter_")?
            .strip_suffix(".md")?
            .parse()
            .ok()
    }
}

async fn read_text(path: &Path) -> FabulaResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::new(StorageErrorKind::NotFound(path.display().to_string())).into()
        } else {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()
        }
    })
}

async fn read_optional(path: &Path) -> FabulaResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
        .into()),
    }
}

fn decode<T: DeserializeOwned>(path: &Path, text: &str) -> FabulaResult<T> {
    serde_json::from_str(text).map_err(|e| {
        StorageError::new(StorageErrorKind::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
        .into()
    })
}

fn encode<T: Serialize>(path: &Path, value: &T) -> FabulaResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        StorageError::new(StorageErrorKind::Encode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
        .into()
    })
}

/// Write `contents` to `path` through a temp file and rename.
async fn write_atomic(path: &Path, contents: &str) -> FabulaResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, contents).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            temp_path.display(),
            e
        )))
    })?;

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        )))
    })?;
    Ok(())
}

/// Remove a file or directory tree; a missing path is not an error.
async fn remove_path(path: &Path, is_dir: bool) -> FabulaResult<bool> {
    let removed = if is_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
            "remove {}: {}",
            path.display(),
            e
        )))
        .into()),
    }
}

/// Strip the `# heading` line written by `save_chapter`.
fn chapter_body(markdown: &str) -> String {
    let body = match markdown.strip_prefix("# ") {
        Some(rest) => rest.split_once("\n\n").map(|(_, body)| body).unwrap_or(""),
        None => markdown,
    };
    body.strip_suffix('\n').unwrap_or(body).to_string()
}

#[async_trait]
impl StoryRepository for FilesystemStoryRepository {
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    async fn load_source(&self) -> FabulaResult<StorySource> {
        let seed = read_text(&self.root.join(SEED_FILE)).await?;
        let beats_path = self.root.join(BEATS_FILE);
        let beats: BeatsFile = toml::from_str(&read_text(&beats_path).await?).map_err(|e| {
            StorageError::new(StorageErrorKind::Malformed {
                path: beats_path.display().to_string(),
                reason: e.to_string(),
            })
        })?;

        tracing::debug!(
            seed_chars = seed.chars().count(),
            beats = beats.beats.len(),
            "Loaded story source"
        );
        Ok(StorySource::new(seed, beats.beats, beats.language))
    }

    #[tracing::instrument(
        skip(self, chapter, beats, reviews),
        fields(chapter = chapter.number(), reviews = reviews.len())
    )]
    async fn save_reviewed_chapter(
        &self,
        chapter: &Chapter,
        beats: &BeatSheet,
        reviews: &BTreeMap<usize, SceneReview>,
    ) -> FabulaResult<()> {
        let number = *chapter.number();
        let markdown = format!("# {}\n\n{}\n", chapter.heading(), chapter.text());
        write_atomic(&self.chapter_path(number), &markdown).await?;

        let metadata = ChapterMetadata::reviewed(chapter, beats, reviews);
        let path = self.metadata_path(number);
        write_atomic(&path, &encode(&path, &metadata)?).await?;

        tracing::info!(
            path = %self.chapter_path(number).display(),
            chars = chapter.text().chars().count(),
            "Saved chapter"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load_chapter(&self, number: usize) -> FabulaResult<Chapter> {
        let metadata_path = self.metadata_path(number);
        let metadata: ChapterMetadata =
            decode(&metadata_path, &read_text(&metadata_path).await?)?;
        let markdown = read_text(&self.chapter_path(number)).await?;
        Ok(metadata.into_chapter(chapter_body(&markdown)))
    }

    async fn list_chapters(&self) -> FabulaResult<Vec<usize>> {
        let dir = self.chapters_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        };

        let mut numbers = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
            })?;
            let Some(entry) = entry else { break };
            if let Some(number) = entry.file_name().to_str().and_then(Self::chapter_number) {
                numbers.push(number);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    async fn save_profile(&self, profile: &StoryProfile) -> FabulaResult<()> {
        let path = self.root.join(PROFILE_FILE);
        write_atomic(&path, &encode(&path, profile)?).await
    }

    async fn load_profile(&self) -> FabulaResult<Option<StoryProfile>> {
        let path = self.root.join(PROFILE_FILE);
        match read_optional(&path).await? {
            Some(text) => Ok(Some(decode(&path, &text)?)),
            None => Ok(None),
        }
    }

    async fn load_characters(&self) -> FabulaResult<CharacterRoster> {
        let path = self.root.join(CHARACTERS_FILE);
        match read_optional(&path).await? {
            Some(text) => decode(&path, &text),
            None => Ok(CharacterRoster::new()),
        }
    }

    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    async fn reset(&self) -> FabulaResult<()> {
        let mut removed = 0;
        for (path, is_dir) in [
            (self.chapters_dir(), true),
            (self.root.join(PROFILE_FILE), false),
            (self.root.join(CHARACTERS_FILE), false),
        ] {
            if remove_path(&path, is_dir).await? {
                removed += 1;
            }
        }
        tracing::info!(removed, "Cleared generated artifacts");
        Ok(())
    }

    #[tracing::instrument(skip(self, roster), fields(incoming = roster.len()))]
    async fn merge_characters(&self, roster: &CharacterRoster) -> FabulaResult<CharacterRoster> {
        let mut merged = self.load_characters().await?;
        let before = merged.len();
        merged.merge(roster);
        let path = self.root.join(CHARACTERS_FILE);
        write_atomic(&path, &encode(&path, &merged)?).await?;
        tracing::info!(before, after = merged.len(), "Saved character profiles");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_numbers_parse_from_file_names() {
        assert_eq!(FilesystemStoryRepository::chapter_number("chapter_12.md"), Some(12));
        assert_eq!(
            FilesystemStoryRepository::chapter_number("chapter_1_metadata.json"),
            None
        );
        assert_eq!(FilesystemStoryRepository::chapter_number("notes.md"), None);
    }

    #[test]
    fn heading_is_stripped_from_body() {
        assert_eq!(
            chapter_body("# Chapter 1: Landfall\n\nThey row.\n\n---\n\nThey climb.\n"),
            "They row.\n\n---\n\nThey climb."
        );
    }
}
