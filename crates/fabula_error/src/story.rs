//! Story pipeline error types.

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineStage {
    /// Input validation before any generation
    #[display("configuration")]
    Configuration,
    /// Story profile analysis
    #[display("analysis")]
    Analysis,
    /// Character profile extraction
    #[display("character extraction")]
    Extraction,
    /// Beat expansion
    #[display("beat expansion")]
    Expansion,
    /// Per-scene style review
    #[display("scene review")]
    Review,
    /// Chapter assembly
    #[display("stitching")]
    Stitching,
}

/// Specific error conditions for the story pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StoryErrorKind {
    /// Bad input detected before any generation started
    #[display("Configuration error: {}", _0)]
    Configuration(String),
    /// Prompt template could not be rendered
    #[display("Template error: {}", _0)]
    Template(String),
    /// Analysis response did not match the story profile schema
    #[display("Analysis response unparseable after {} attempt(s): {}", attempts, reason)]
    AnalysisParse {
        /// Attempts made, including retries
        attempts: u32,
        /// Decoder message for the last attempt
        reason: String,
    },
    /// Extraction response did not match the character profile schema
    #[display("Character extraction response unparseable after {} attempt(s): {}", attempts, reason)]
    ExtractionParse {
        /// Attempts made, including retries
        attempts: u32,
        /// Decoder message for the last attempt
        reason: String,
    },
    /// Beat expansion failed or returned degenerate content
    #[display("Generation failed for beat {}: {}", beat_index, reason)]
    Generation {
        /// 1-based beat index
        beat_index: usize,
        /// What went wrong
        reason: String,
    },
    /// Style review response did not match the review schema
    #[display("Review of beat {} unparseable after {} attempt(s): {}", beat_index, attempts, reason)]
    ReviewParse {
        /// 1-based beat index of the reviewed scene
        beat_index: usize,
        /// Attempts made, including retries
        attempts: u32,
        /// Decoder message for the last attempt
        reason: String,
    },
    /// A scene reached the stitcher ahead of or behind its beat
    #[display("Scene for beat {} arrived while beat {} was expected", found, expected)]
    SceneOutOfOrder {
        /// Beat index the stitcher expected next
        expected: usize,
        /// Beat index of the scene that arrived
        found: usize,
    },
    /// The run was cancelled
    #[display("Run cancelled before beat {}", beat_index)]
    Cancelled {
        /// Beat that was in flight or next
        beat_index: usize,
    },
}

impl StoryErrorKind {
    /// The stage this condition belongs to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            StoryErrorKind::Configuration(_) | StoryErrorKind::Template(_) => {
                PipelineStage::Configuration
            }
            StoryErrorKind::AnalysisParse { .. } => PipelineStage::Analysis,
            StoryErrorKind::ExtractionParse { .. } => PipelineStage::Extraction,
            StoryErrorKind::Generation { .. } | StoryErrorKind::Cancelled { .. } => {
                PipelineStage::Expansion
            }
            StoryErrorKind::ReviewParse { .. } => PipelineStage::Review,
            StoryErrorKind::SceneOutOfOrder { .. } => PipelineStage::Stitching,
        }
    }

    /// The beat this condition concerns, if any.
    pub fn beat_index(&self) -> Option<usize> {
        match self {
            StoryErrorKind::Generation { beat_index, .. }
            | StoryErrorKind::ReviewParse { beat_index, .. }
            | StoryErrorKind::Cancelled { beat_index } => Some(*beat_index),
            StoryErrorKind::SceneOutOfOrder { found, .. } => Some(*found),
            _ => None,
        }
    }
}

/// Error type for story pipeline operations.
///
/// # Examples
///
/// ```
/// use fabula_error::{PipelineStage, StoryError, StoryErrorKind};
///
/// let err = StoryError::new(StoryErrorKind::AnalysisParse {
///     attempts: 2,
///     reason: "missing field `style`".to_string(),
/// });
/// assert_eq!(err.stage(), PipelineStage::Analysis);
/// assert!(format!("{}", err).contains("2 attempt"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Story Error [{}]: {} at line {} in {}", kind.stage(), kind, line, file)]
pub struct StoryError {
    /// The specific error condition
    pub kind: StoryErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StoryError {
    /// Create a new StoryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// The stage the error was raised in.
    pub fn stage(&self) -> PipelineStage {
        self.kind.stage()
    }

    /// The beat the error concerns, if any.
    pub fn beat_index(&self) -> Option<usize> {
        self.kind.beat_index()
    }
}
