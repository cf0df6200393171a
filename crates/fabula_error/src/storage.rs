//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create a directory
    #[display("Failed to create directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Artifact not found at the specified location
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Artifact could not be serialized for writing
    #[display("Failed to encode {}: {}", path, reason)]
    Encode {
        /// Destination path
        path: String,
        /// Encoder message
        reason: String,
    },
    /// Stored artifact could not be decoded
    #[display("Malformed artifact {}: {}", path, reason)]
    Malformed {
        /// Path of the artifact
        path: String,
        /// Decoder message
        reason: String,
    },
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("chapters/chapter_2.md".to_string()));
/// assert!(format!("{}", err).contains("Not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the artifact was simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NotFound(_))
    }
}
