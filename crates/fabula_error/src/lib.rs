//! Error types for Fabula.
//!
//! This crate provides the foundation error types used throughout the Fabula workspace.
//!
//! # Error Hierarchy
//!
//! Every error family follows the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! The pipeline taxonomy (configuration, analysis parse, extraction parse,
//! generation) lives in [`StoryErrorKind`].
//!
//! # Examples
//!
//! ```
//! use fabula_error::{FabulaResult, StoryError, StoryErrorKind};
//!
//! fn load_beats(beats: &[String]) -> FabulaResult<usize> {
//!     if beats.is_empty() {
//!         Err(StoryError::new(StoryErrorKind::Configuration(
//!             "beat list is empty".to_string(),
//!         )))?
//!     }
//!     Ok(beats.len())
//! }
//!
//! assert!(load_beats(&[]).is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod models;
mod storage;
mod story;

pub use config::{ConfigError, ConfigErrorKind};
pub use error::{FabulaError, FabulaErrorKind, FabulaResult};
pub use models::{ModelsError, ModelsErrorKind, ModelsResult};
pub use storage::{StorageError, StorageErrorKind};
pub use story::{PipelineStage, StoryError, StoryErrorKind};
