//! The end-to-end run: analysis, beat loop, stitching, and concurrent
//! character extraction.

use crate::{
    BeatExpander, ChapterPolicy, CharacterExtractor, ContextWindow, FabulaConfig,
    LanguageDetector, NarrativeStitcher, PromptTemplates, RetryPolicy, SceneReviewer,
    StoryAnalyzer,
};
use fabula_core::{
    BeatSheet, Chapter, CharacterRoster, GeneratedScene, SceneReview, StoryProfile, StyleHints,
};
use std::collections::BTreeMap;
use fabula_error::{FabulaError, FabulaResult, StoryError, StoryErrorKind};
use fabula_interface::CompletionDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Chapters already produced by an earlier run, to continue from.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct ResumePoint {
    chapters: Vec<Chapter>,
    profile: Option<StoryProfile>,
}

impl ResumePoint {
    /// Start from beat 1.
    pub fn start() -> Self {
        Self::default()
    }

    /// Continue after `chapters`, which must cover beats `1..=k` in order.
    pub fn after(chapters: Vec<Chapter>) -> Self {
        Self {
            chapters,
            profile: None,
        }
    }

    /// Reuse a previously analyzed profile instead of analyzing again.
    pub fn with_profile(mut self, profile: StoryProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// The first beat still to be expanded.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when the chapters do not cover a
    /// contiguous run of beats starting at 1.
    pub fn next_beat(&self) -> Result<usize, StoryError> {
        let mut expected = 1;
        for chapter in &self.chapters {
            for &index in chapter.beat_indices() {
                if index != expected {
                    return Err(StoryError::new(StoryErrorKind::Configuration(format!(
                        "chapter {} covers beat {} but beat {} was expected",
                        chapter.number(),
                        index,
                        expected
                    ))));
                }
                expected += 1;
            }
        }
        Ok(expected)
    }
}

/// A run that produced every chapter.
#[derive(Debug, derive_getters::Getters)]
pub struct StoryRun {
    chapters: Vec<Chapter>,
    profile: StoryProfile,
    hints: StyleHints,
    /// Style reviews by beat index, when reviews are enabled
    reviews: BTreeMap<usize, SceneReview>,
    /// `None` when extraction was disabled or cancelled
    characters: Option<FabulaResult<CharacterRoster>>,
}

impl StoryRun {
    /// Split into chapters and the character extraction outcome.
    pub fn into_parts(self) -> (Vec<Chapter>, Option<FabulaResult<CharacterRoster>>) {
        (self.chapters, self.characters)
    }
}

/// A run that stopped early, with whatever was completed before the failure.
///
/// Chapters still open when the run stopped are discarded.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_getters::Getters)]
#[display("Run aborted after {} completed chapter(s): {}", chapters.len(), error)]
pub struct AbortedRun {
    #[error(source)]
    error: FabulaError,
    chapters: Vec<Chapter>,
    profile: Option<StoryProfile>,
    reviews: BTreeMap<usize, SceneReview>,
    characters: Option<FabulaResult<CharacterRoster>>,
}

impl AbortedRun {
    /// Split into the error, completed chapters, and extraction outcome.
    pub fn into_parts(
        self,
    ) -> (
        FabulaError,
        Vec<Chapter>,
        Option<FabulaResult<CharacterRoster>>,
    ) {
        (self.error, self.chapters, self.characters)
    }
}

struct Halt {
    error: FabulaError,
    chapters: Vec<Chapter>,
    profile: Option<StoryProfile>,
    reviews: BTreeMap<usize, SceneReview>,
}

impl Halt {
    fn new(error: impl Into<FabulaError>, chapters: Vec<Chapter>, profile: Option<StoryProfile>) -> Self {
        Self {
            error: error.into(),
            chapters,
            profile,
            reviews: BTreeMap::new(),
        }
    }

    fn with_reviews(mut self, reviews: BTreeMap<usize, SceneReview>) -> Self {
        self.reviews = reviews;
        self
    }
}

/// What the beat loop hands back on success.
struct Narrated {
    chapters: Vec<Chapter>,
    profile: StoryProfile,
    hints: StyleHints,
    reviews: BTreeMap<usize, SceneReview>,
}

/// Drives a story from seed and beats to chapters.
///
/// The analyzer runs first; beats then expand strictly in order, each scene
/// advancing the context window through the stitcher before the next beat
/// is sent. Character extraction runs alongside on the same seed and its
/// failure never stops the narrative.
///
/// # Example
///
/// ```rust,ignore
/// use fabula_core::BeatSheet;
/// use fabula_models::OpenAIDriver;
/// use fabula_narrative::{FabulaConfig, StoryPipeline};
/// use tokio_util::sync::CancellationToken;
///
/// let config = FabulaConfig::load()?;
/// let driver = OpenAIDriver::from_env(config.model().name(), 120)?;
/// let pipeline = StoryPipeline::new(driver, config.prompt_templates()?, config);
///
/// let beats = BeatSheet::from_entries(["The keeper finds a letter", "A storm arrives"])?;
/// let run = pipeline.run(&seed, &beats, CancellationToken::new()).await?;
/// for chapter in run.chapters() {
///     println!("{}", chapter.heading());
/// }
/// ```
pub struct StoryPipeline<D: CompletionDriver> {
    driver: D,
    templates: PromptTemplates,
    config: FabulaConfig,
    detector: LanguageDetector,
    extract_characters: bool,
}

impl<D: CompletionDriver> StoryPipeline<D> {
    /// Create a pipeline.
    pub fn new(driver: D, templates: PromptTemplates, config: FabulaConfig) -> Self {
        Self {
            driver,
            templates,
            config,
            detector: LanguageDetector::new(),
            extract_characters: true,
        }
    }

    /// Skip character extraction during runs.
    pub fn without_characters(mut self) -> Self {
        self.extract_characters = false;
        self
    }

    /// Use a different language detector.
    pub fn with_detector(mut self, detector: LanguageDetector) -> Self {
        self.detector = detector;
        self
    }

    /// The completion driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The run configuration.
    pub fn config(&self) -> &FabulaConfig {
        &self.config
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy::from(self.config.retry())
    }

    /// An analyzer sharing this pipeline's driver and templates.
    pub fn analyzer(&self) -> StoryAnalyzer<'_, D> {
        let model = self.config.model();
        StoryAnalyzer::new(&self.driver, &self.templates, self.policy())
            .with_sampling(*model.analysis_temperature(), *model.max_tokens())
    }

    /// A character extractor sharing this pipeline's driver and templates.
    pub fn extractor(&self) -> CharacterExtractor<'_, D> {
        let model = self.config.model();
        CharacterExtractor::new(&self.driver, &self.templates, self.policy())
            .with_sampling(*model.analysis_temperature(), *model.max_tokens())
    }

    /// A scene reviewer sharing this pipeline's driver and templates.
    pub fn reviewer(&self) -> SceneReviewer<'_, D> {
        let model = self.config.model();
        SceneReviewer::new(&self.driver, &self.templates, self.policy())
            .with_sampling(*model.analysis_temperature(), *model.max_tokens())
    }

    /// A beat expander sharing this pipeline's driver and templates.
    pub fn expander(&self) -> BeatExpander<'_, D> {
        let model = self.config.model();
        BeatExpander::new(&self.driver, &self.templates, self.policy())
            .with_sampling(*model.temperature(), *model.max_tokens())
    }

    /// Run every beat from the start.
    ///
    /// # Errors
    ///
    /// Returns an [`AbortedRun`] holding the chapters completed before the
    /// failure.
    pub async fn run(
        &self,
        seed: &str,
        beats: &BeatSheet,
        cancel: CancellationToken,
    ) -> Result<StoryRun, AbortedRun> {
        self.resume(seed, beats, ResumePoint::start(), cancel).await
    }

    /// Continue a run after the chapters in `from`.
    ///
    /// The given chapters are returned unmodified ahead of the new ones, and
    /// the context window is rebuilt from their prose.
    ///
    /// # Errors
    ///
    /// Returns an [`AbortedRun`] holding the chapters completed before the
    /// failure, including those passed in.
    #[instrument(
        skip_all,
        fields(
            beats = beats.len(),
            completed_chapters = from.chapters().len(),
            provider = self.driver.provider_name(),
            model = self.driver.model_name()
        )
    )]
    pub async fn resume(
        &self,
        seed: &str,
        beats: &BeatSheet,
        from: ResumePoint,
        cancel: CancellationToken,
    ) -> Result<StoryRun, AbortedRun> {
        let narrative = self.narrate(seed, beats, from, &cancel);
        let characters = self.characters_alongside(seed, &cancel);
        let (narrative, characters) = tokio::join!(narrative, characters);

        match narrative {
            Ok(Narrated {
                chapters,
                profile,
                hints,
                reviews,
            }) => {
                info!(chapters = chapters.len(), reviews = reviews.len(), "Run complete");
                Ok(StoryRun {
                    chapters,
                    profile,
                    hints,
                    reviews,
                    characters,
                })
            }
            Err(halt) => {
                warn!(error = %halt.error, kept = halt.chapters.len(), "Run aborted");
                Err(AbortedRun {
                    error: halt.error,
                    chapters: halt.chapters,
                    profile: halt.profile,
                    reviews: halt.reviews,
                    characters,
                })
            }
        }
    }

    async fn characters_alongside(
        &self,
        seed: &str,
        cancel: &CancellationToken,
    ) -> Option<FabulaResult<CharacterRoster>> {
        if !self.extract_characters {
            return None;
        }
        let extractor = self.extractor();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Character extraction cancelled");
                None
            }
            result = extractor.extract(seed) => {
                if let Err(e) = &result {
                    warn!(error = %e, "Character extraction failed; continuing without it");
                }
                Some(result)
            }
        }
    }

    async fn narrate(
        &self,
        seed: &str,
        beats: &BeatSheet,
        from: ResumePoint,
        cancel: &CancellationToken,
    ) -> Result<Narrated, Halt> {
        let next_beat = from.next_beat();
        let ResumePoint { chapters, profile } = from;
        let next_beat = match next_beat {
            Ok(next) => next,
            Err(e) => return Err(Halt::new(e, chapters, profile)),
        };

        let pipeline = self.config.pipeline();
        let hints = self.detector.detect(seed, *pipeline.language());
        info!(
            language = %hints.language(),
            pov = %hints.pov(),
            tense = %hints.tense(),
            next_beat,
            "Starting narrative"
        );

        let profile = match profile {
            Some(profile) => profile,
            None => {
                let analyzer = self.analyzer();
                let analyzed = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(cancelled(next_beat)),
                    result = analyzer.analyze(seed) => result,
                };
                match analyzed {
                    Ok(profile) => profile,
                    Err(e) => return Err(Halt::new(e, chapters, None)),
                }
            }
        };

        let window = if chapters.is_empty() {
            ContextWindow::seeded(
                *pipeline.context_capacity(),
                seed,
                *pipeline.seed_excerpt_chars(),
            )
        } else {
            replay_window(
                *pipeline.context_capacity(),
                &chapters,
                pipeline.scene_separator(),
            )
        };
        let mut stitcher = NarrativeStitcher::resuming(
            window,
            ChapterPolicy::new(*pipeline.beats_per_chapter(), pipeline.scene_separator().as_str()),
            *hints.language(),
            next_beat,
            chapters.len() + 1,
        );

        let expander = self.expander();
        let mut chapters = chapters;
        let mut reviews = BTreeMap::new();
        for beat in beats.iter().skip(next_beat.saturating_sub(1)) {
            let expanded = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(cancelled(*beat.index())),
                result = expander.expand(beat, stitcher.context().current(), &profile, &hints) => result,
            };
            let scene = match expanded {
                Ok(scene) => scene,
                Err(e) => {
                    return Err(Halt::new(e, chapters, Some(profile)).with_reviews(reviews));
                }
            };

            if *pipeline.review_scenes() {
                match self.review_scene(&scene, cancel).await {
                    Ok(Some(review)) => {
                        reviews.insert(*scene.beat_index(), review);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        return Err(Halt::new(e, chapters, Some(profile)).with_reviews(reviews));
                    }
                }
            }

            match stitcher.accept(&scene, beat) {
                Ok(closed) => chapters.extend(closed),
                Err(e) => {
                    return Err(Halt::new(e, chapters, Some(profile)).with_reviews(reviews));
                }
            }
        }
        chapters.extend(stitcher.finish());

        Ok(Narrated {
            chapters,
            profile,
            hints,
            reviews,
        })
    }

    /// Review one scene. A failed review is logged and yields `None`; only
    /// cancellation is an error.
    async fn review_scene(
        &self,
        scene: &GeneratedScene,
        cancel: &CancellationToken,
    ) -> FabulaResult<Option<SceneReview>> {
        let reviewer = self.reviewer();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled(*scene.beat_index())),
            result = reviewer.review(scene) => match result {
                Ok(review) => Ok(Some(review)),
                Err(e) => {
                    warn!(beat = scene.beat_index(), error = %e, "Scene review failed; continuing without it");
                    Ok(None)
                }
            },
        }
    }
}

fn cancelled(beat_index: usize) -> FabulaError {
    StoryError::new(StoryErrorKind::Cancelled { beat_index }).into()
}

/// Rebuild the context window from finished chapters, scene by scene.
fn replay_window(capacity: usize, chapters: &[Chapter], separator: &str) -> ContextWindow {
    let mut window = ContextWindow::new(capacity);
    let divider = format!("\n\n{}\n\n", separator);
    for chapter in chapters {
        if separator.is_empty() {
            window.advance(chapter.text());
            continue;
        }
        for scene in chapter.text().split(divider.as_str()) {
            window.advance(scene);
        }
    }
    window
}
