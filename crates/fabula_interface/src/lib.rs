//! Trait definitions for Fabula.
//!
//! This crate defines the two seams the pipeline talks through: the text
//! completion backend and the persistence of run artifacts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod repository;
mod traits;

pub use repository::{StoryRepository, StorySource};
pub use traits::CompletionDriver;
