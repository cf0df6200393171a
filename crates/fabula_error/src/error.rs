//! Top-level error wrapper types.

use crate::{ConfigError, ModelsError, StorageError, StoryError, StoryErrorKind};

/// Every error family that can surface from a Fabula operation.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, ConfigError};
///
/// let err: FabulaError = ConfigError::invalid("model.temperature", "must be between 0 and 2").into();
/// assert!(format!("{}", err).contains("model.temperature"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FabulaErrorKind {
    /// Configuration file or value error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Completion backend error
    #[from(ModelsError)]
    Models(ModelsError),
    /// Story pipeline error
    #[from(StoryError)]
    Story(StoryError),
}

/// Fabula error with kind discrimination.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, FabulaResult, StoryError, StoryErrorKind};
///
/// fn expand() -> FabulaResult<()> {
///     Err(StoryError::new(StoryErrorKind::Generation {
///         beat_index: 3,
///         reason: "empty response".to_string(),
///     }))?
/// }
///
/// let err = expand().unwrap_err();
/// assert_eq!(err.story().and_then(|e| e.beat_index()), Some(3));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Fabula Error: {}", _0)]
pub struct FabulaError(Box<FabulaErrorKind>);

impl FabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: FabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FabulaErrorKind {
        &self.0
    }

    /// The pipeline error, if this error came from the story pipeline.
    pub fn story(&self) -> Option<&StoryError> {
        match self.kind() {
            FabulaErrorKind::Story(e) => Some(e),
            _ => None,
        }
    }

    /// The pipeline error kind, if any.
    pub fn story_kind(&self) -> Option<&StoryErrorKind> {
        self.story().map(|e| &e.kind)
    }

    /// The backend error, if this error came from the completion backend.
    pub fn models(&self) -> Option<&ModelsError> {
        match self.kind() {
            FabulaErrorKind::Models(e) => Some(e),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to FabulaErrorKind
impl<T> From<T> for FabulaError
where
    T: Into<FabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Fabula operations.
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;
