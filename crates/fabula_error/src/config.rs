//! Configuration error types.

/// What went wrong while loading or checking configuration.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// Layered sources could not be read or merged
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
    /// A setting is out of range
    #[display("Invalid setting {}: {}", key, reason)]
    Invalid {
        /// Dotted key, e.g. `pipeline.context_capacity`
        key: String,
        /// Why the value was rejected
        reason: String,
    },
    /// A prompt template override file could not be read
    #[display("Failed to read templates from {}: {}", path, reason)]
    Templates {
        /// Path of the override file
        path: String,
        /// I/O message
        reason: String,
    },
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use fabula_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::invalid("pipeline.context_capacity", "must be positive");
/// assert_eq!(err.key(), Some("pipeline.context_capacity"));
/// assert!(matches!(err.kind, ConfigErrorKind::Invalid { .. }));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// What went wrong
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError at the current location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Reject the value of `key`.
    #[track_caller]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid {
            key: key.into(),
            reason: reason.into(),
        })
    }

    /// The offending setting, for `Invalid` errors.
    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            ConfigErrorKind::Invalid { key, .. } => Some(key),
            _ => None,
        }
    }
}
