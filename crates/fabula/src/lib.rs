//! Fabula - seed story and beats in, chapters out.
//!
//! Fabula expands an author's outline into continuous prose. A seed document
//! sets the story's voice and world; an ordered list of short beats says
//! what happens next. Each beat becomes a scene written against the story so
//! far, and scenes are stitched into chapters.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fabula::{
//!     BeatSheet, FabulaConfig, FilesystemStoryRepository, OpenAIDriver, StoryPipeline,
//!     StoryRepository,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FabulaConfig::load()?;
//!     let repo = FilesystemStoryRepository::new("my_story");
//!     let source = repo.load_source().await?;
//!     let beats = BeatSheet::from_entries(source.beats())?;
//!
//!     let driver = OpenAIDriver::from_env(config.model().name(), *config.retry().timeout_secs())?;
//!     let pipeline = StoryPipeline::new(driver, config.prompt_templates()?, config);
//!     let run = pipeline.run(source.seed(), &beats, CancellationToken::new()).await?;
//!
//!     for chapter in run.chapters() {
//!         repo.save_chapter(chapter, &beats).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `fabula_error` - Error types
//! - `fabula_core` - Beats, profiles, characters, chapters, telemetry
//! - `fabula_interface` - `CompletionDriver` and `StoryRepository` traits
//! - `fabula_models` - OpenAI-compatible completion driver
//! - `fabula_narrative` - The beat-processing pipeline
//! - `fabula_storage` - Story directory persistence
//!
//! This crate (`fabula`) re-exports everything for convenience.

pub use fabula_core::*;
pub use fabula_error::*;
pub use fabula_interface::*;
pub use fabula_models::*;
pub use fabula_narrative::*;
pub use fabula_storage::*;
