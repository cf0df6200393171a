//! Layered configuration for Fabula runs.
//!
//! Sources, later overriding earlier:
//! 1. Bundled defaults (include_str! from fabula.toml)
//! 2. `~/.config/fabula/fabula.toml`
//! 3. `./fabula.toml`
//! 4. `FABULA__SECTION__KEY` environment variables

use crate::PromptTemplates;
use config::{Config, Environment, File, FileFormat};
use fabula_core::LanguageSelection;
use fabula_error::{ConfigError, ConfigErrorKind, FabulaError, FabulaResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../fabula.toml");

/// Completion model parameters.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ModelSettings {
    /// Model identifier
    name: String,
    /// Temperature for prose generation
    temperature: f32,
    /// Token limit per completion
    max_tokens: u32,
    /// Temperature for analysis and extraction calls
    analysis_temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            analysis_temperature: 0.3,
        }
    }
}

/// Beat loop parameters.
///
/// # Examples
///
/// ```
/// use fabula_core::{Language, LanguageSelection};
/// use fabula_narrative::PipelineSettingsBuilder;
///
/// let settings = PipelineSettingsBuilder::default()
///     .language(LanguageSelection::Explicit(Language::En))
///     .beats_per_chapter(2usize)
///     .build()
///     .unwrap();
/// assert_eq!(*settings.context_capacity(), 4000);
/// assert_eq!(settings.scene_separator(), "---");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into), default)]
pub struct PipelineSettings {
    /// `auto` or a supported language code
    language: LanguageSelection,
    /// Characters of prior prose handed to each expansion
    context_capacity: usize,
    /// Beats per chapter; 0 means markers only
    beats_per_chapter: usize,
    /// Text placed between scenes within a chapter
    scene_separator: String,
    /// Characters from the end of the seed used as context before the first beat
    seed_excerpt_chars: usize,
    /// Ask for a style review of every generated scene
    #[serde(default)]
    review_scenes: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            language: LanguageSelection::Auto,
            context_capacity: 4000,
            beats_per_chapter: 5,
            scene_separator: "---".to_string(),
            seed_excerpt_chars: 1500,
            review_scenes: false,
        }
    }
}

/// Timeout and retry parameters for completion calls.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into), default)]
pub struct RetrySettings {
    /// Retries after the first attempt
    max_retries: usize,
    /// First backoff delay
    initial_backoff_ms: u64,
    /// Backoff ceiling
    max_backoff_ms: u64,
    /// Per-call timeout
    timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
            timeout_secs: 120,
        }
    }
}

/// Where to find prompt template overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct TemplateSettings {
    /// Optional TOML override file
    #[serde(default)]
    path: Option<PathBuf>,
}

/// Top-level Fabula configuration.
///
/// # Example
///
/// ```no_run
/// use fabula_narrative::FabulaConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FabulaConfig::load()?;
/// println!("model: {}", config.model().name());
/// # Ok(())
/// # }
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct FabulaConfig {
    /// Model parameters
    #[serde(default)]
    model: ModelSettings,
    /// Beat loop parameters
    #[serde(default)]
    pipeline: PipelineSettings,
    /// Retry parameters
    #[serde(default)]
    retry: RetrySettings,
    /// Template override location
    #[serde(default)]
    templates: TemplateSettings,
}

impl FabulaConfig {
    /// Create a configuration from its sections.
    pub fn new(
        model: ModelSettings,
        pipeline: PipelineSettings,
        retry: RetrySettings,
        templates: TemplateSettings,
    ) -> Self {
        Self {
            model,
            pipeline,
            retry,
            templates,
        }
    }

    /// Load configuration with precedence: env > current dir > home dir >
    /// bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or a value is out
    /// of range.
    #[instrument]
    pub fn load() -> FabulaResult<Self> {
        debug!("Loading configuration: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/fabula/fabula.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("fabula").required(false))
            .add_source(
                Environment::with_prefix("FABULA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Load bundled defaults overlaid with one specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> FabulaResult<Self> {
        debug!("Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Parse configuration from a TOML string over the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn from_toml_str(content: &str) -> FabulaResult<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(content, FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> FabulaResult<Self> {
        let config: FabulaConfig = builder
            .build()
            .map_err(|e| {
                FabulaError::from(ConfigError::new(ConfigErrorKind::Load(e.to_string())))
            })?
            .try_deserialize()
            .map_err(|e| {
                FabulaError::from(ConfigError::new(ConfigErrorKind::Load(format!(
                    "invalid value: {}",
                    e
                ))))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.context_capacity == 0 {
            return Err(ConfigError::invalid("pipeline.context_capacity", "must be positive"));
        }
        if self.retry.timeout_secs == 0 {
            return Err(ConfigError::invalid("retry.timeout_secs", "must be positive"));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::invalid("model.max_tokens", "must be positive"));
        }
        for (key, value) in [
            ("model.temperature", self.model.temperature),
            ("model.analysis_temperature", self.model.analysis_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::invalid(
                    key,
                    format!("must be between 0 and 2, got {}", value),
                ));
            }
        }
        Ok(())
    }

    /// Replace the pipeline section.
    pub fn with_pipeline(mut self, pipeline: PipelineSettings) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replace the retry section.
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Mutable access to the pipeline section, for command-line overrides.
    pub fn pipeline_mut(&mut self) -> &mut PipelineSettings {
        &mut self.pipeline
    }

    /// Resolve prompt templates: the override file if configured, else the
    /// bundled set.
    ///
    /// # Errors
    ///
    /// Returns an error if the override file is unreadable or invalid.
    pub fn prompt_templates(&self) -> FabulaResult<PromptTemplates> {
        match &self.templates.path {
            Some(path) => PromptTemplates::load(path),
            None => Ok(PromptTemplates::default()),
        }
    }
}

impl PipelineSettings {
    /// Override the language selection.
    pub fn set_language(&mut self, language: LanguageSelection) {
        self.language = language;
    }

    /// Override the chapter length.
    pub fn set_beats_per_chapter(&mut self, beats: usize) {
        self.beats_per_chapter = beats;
    }

    /// Turn per-scene style reviews on or off.
    pub fn set_review_scenes(&mut self, review: bool) {
        self.review_scenes = review;
    }
}
