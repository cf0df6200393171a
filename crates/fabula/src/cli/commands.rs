//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use fabula::{FabulaConfig, FabulaResult};
use std::path::PathBuf;

/// Fabula - expand a seed story and beat outline into chaptered prose
#[derive(Parser, Debug)]
#[command(name = "fabula")]
#[command(about = "Expand a seed story and beat outline into chaptered prose", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Also export tracing spans to stdout
    #[arg(long, global = true)]
    pub otel_stdout: bool,

    /// Configuration file to use instead of the usual search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load configuration from `--config` or the default search path.
    pub fn load_config(&self) -> FabulaResult<FabulaConfig> {
        match &self.config {
            Some(path) => FabulaConfig::from_file(path),
            None => FabulaConfig::load(),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate chapters for a story directory
    Run(RunArgs),

    /// Extract character profiles and merge them into the story directory
    Characters {
        /// Story directory containing story.md
        #[arg(long)]
        story: PathBuf,
    },

    /// List saved chapters
    Chapters {
        /// Story directory
        #[arg(long)]
        story: PathBuf,
    },

    /// Print a saved chapter
    Show {
        /// Story directory
        #[arg(long)]
        story: PathBuf,

        /// Chapter number
        number: usize,
    },
}

/// Options for `fabula run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Story directory containing story.md and beats.toml
    #[arg(long)]
    pub story: PathBuf,

    /// Language code or `auto`; overrides beats.toml and configuration
    #[arg(long)]
    pub language: Option<String>,

    /// Beats per chapter; 0 means chapter markers only
    #[arg(long)]
    pub beats_per_chapter: Option<usize>,

    /// Skip character extraction
    #[arg(long)]
    pub no_characters: bool,

    /// Continue after the chapters already saved in the story directory.
    /// Without it, earlier chapters, profile and characters are cleared first.
    #[arg(long)]
    pub resume: bool,

    /// Store a style review of each scene in the chapter metadata
    #[arg(long)]
    pub review_scenes: bool,
}
