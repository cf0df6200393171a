//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the fabula binary.

mod chapters;
mod characters;
mod commands;
mod run;

pub use chapters::{list_chapters, show_chapter};
pub use characters::extract_characters;
pub use commands::{Cli, Commands, RunArgs};
pub use run::run_story;
