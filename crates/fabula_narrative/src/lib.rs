//! Beat-processing pipeline for Fabula.
//!
//! This crate turns a seed story and an ordered beat sheet into chapters of
//! continuous prose. The pipeline analyzes the seed into a story profile,
//! expands each beat in order against a bounded window of prior prose, and
//! stitches the scenes into chapters. Character extraction runs alongside.
//!
//! # Components
//!
//! - [`PromptTemplates`]: injected instruction templates with strict rendering
//! - [`LanguageDetector`]: language, point of view, and tense hints
//! - [`StoryAnalyzer`]: seed to [`StoryProfile`](fabula_core::StoryProfile)
//! - [`ContextWindow`]: the most recent prose, trimmed on sentence and
//!   paragraph boundaries
//! - [`BeatExpander`]: one labeled completion request per beat
//! - [`NarrativeStitcher`]: ordered scenes to chapters
//! - [`CharacterExtractor`]: seed to [`CharacterRoster`](fabula_core::CharacterRoster)
//! - [`SceneReviewer`]: optional style review of each scene
//! - [`StoryPipeline`]: all of the above, with retry, timeout, and cancellation
//!
//! # Example
//!
//! ```rust,ignore
//! use fabula_core::BeatSheet;
//! use fabula_models::OpenAIDriver;
//! use fabula_narrative::{FabulaConfig, StoryPipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(seed: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = FabulaConfig::load()?;
//! let driver = OpenAIDriver::from_env(config.model().name(), *config.retry().timeout_secs())?;
//! let pipeline = StoryPipeline::new(driver, config.prompt_templates()?, config);
//!
//! let beats = BeatSheet::from_entries(["# Landfall", "The keeper rows ashore"])?;
//! let run = pipeline.run(seed, &beats, CancellationToken::new()).await?;
//! println!("{} chapters", run.chapters().len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod characters;
mod config;
mod context;
mod expander;
mod extraction;
mod language;
mod pipeline;
mod retry;
mod review;
mod stitcher;
mod structured;
mod templates;

pub use analyzer::StoryAnalyzer;
pub use characters::{CharacterExtractor, decode_roster};
pub use config::{
    FabulaConfig, ModelSettings, ModelSettingsBuilder, PipelineSettings, PipelineSettingsBuilder,
    RetrySettings, RetrySettingsBuilder, TemplateSettings,
};
pub use context::ContextWindow;
pub use expander::BeatExpander;
pub use extraction::{DecodeFailure, decode_json, extract_json_object};
pub use language::{LanguageDetector, detect_pov, detect_tense, infer_language};
pub use pipeline::{AbortedRun, ResumePoint, StoryPipeline, StoryRun};
pub use retry::{RetryPolicy, generate_with_retry, generate_with_timeout, is_transient, retry};
pub use review::SceneReviewer;
pub use stitcher::{ChapterPolicy, NarrativeStitcher, stitch};
pub use templates::{BEAT_PLACEHOLDERS, PromptTemplates, render};
