//! Fabula CLI binary.
//!
//! This binary provides command-line access to Fabula:
//! - Generate chapters for a story directory
//! - Extract and merge character profiles
//! - List and show saved chapters

use clap::Parser;
use fabula::{TelemetryConfig, init_telemetry, shutdown_telemetry};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, extract_characters, list_chapters, run_story, show_chapter};

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::default();
    if cli.verbose {
        telemetry = telemetry.verbose();
    }
    if cli.json_logs {
        telemetry = telemetry.json();
    }
    telemetry.otel_stdout = cli.otel_stdout;
    init_telemetry(&telemetry)?;

    let config = cli.load_config()?;

    let result = match cli.command {
        Commands::Run(args) => run_story(config, args).await,
        Commands::Characters { story } => extract_characters(config, &story).await,
        Commands::Chapters { story } => list_chapters(&story).await,
        Commands::Show { story, number } => show_chapter(&story, number).await,
    };

    shutdown_telemetry();
    result
}
