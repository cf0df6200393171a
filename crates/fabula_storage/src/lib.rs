//! Filesystem persistence for Fabula.
//!
//! A story lives in one directory:
//!
//! ```text
//! my_story/
//! ├── story.md                  seed text
//! ├── beats.toml                beats = [...], optional language
//! ├── story_profile.json        analyzed profile
//! ├── character_profiles.json   merged character roster
//! └── chapters/
//!     ├── chapter_1.md
//!     └── chapter_1_metadata.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod metadata;

pub use filesystem::FilesystemStoryRepository;
pub use metadata::{BeatsFile, ChapterMetadata, SceneMetadata};
