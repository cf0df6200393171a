//! Story generation command handler.

use crate::cli::RunArgs;
use fabula::{
    BeatSheet, Chapter, FabulaConfig, FabulaResult, FilesystemStoryRepository, LanguageSelection,
    OpenAIDriver, ResumePoint, SceneReview, StoryPipeline, StoryRepository,
};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Resolve the language: command line, then beats.toml, then configuration.
fn language_override(
    args: &RunArgs,
    from_beats_file: Option<&str>,
) -> FabulaResult<Option<LanguageSelection>> {
    let code = args.language.as_deref().or(from_beats_file);
    Ok(match code {
        Some(code) => Some(code.parse::<LanguageSelection>()?),
        None => None,
    })
}

/// Gather the chapters and profile saved by an earlier run.
async fn resume_point(repo: &FilesystemStoryRepository) -> FabulaResult<ResumePoint> {
    let mut chapters = Vec::new();
    for number in repo.list_chapters().await? {
        chapters.push(repo.load_chapter(number).await?);
    }
    let point = ResumePoint::after(chapters);
    Ok(match repo.load_profile().await? {
        Some(profile) => point.with_profile(profile),
        None => point,
    })
}

async fn save_new_chapters(
    repo: &FilesystemStoryRepository,
    chapters: &[Chapter],
    already_saved: usize,
    beats: &BeatSheet,
    reviews: &BTreeMap<usize, SceneReview>,
) -> FabulaResult<()> {
    for chapter in chapters.iter().skip(already_saved) {
        repo.save_reviewed_chapter(chapter, beats, reviews).await?;
        println!("✓ {}", chapter.heading());
    }
    Ok(())
}

/// Run the pipeline for one story directory and save what it produces.
pub async fn run_story(
    mut config: FabulaConfig,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = FilesystemStoryRepository::new(&args.story);
    let source = repo.load_source().await?;

    if let Some(language) = language_override(&args, source.language().as_deref())? {
        config.pipeline_mut().set_language(language);
    }
    if let Some(beats) = args.beats_per_chapter {
        config.pipeline_mut().set_beats_per_chapter(beats);
    }
    if args.review_scenes {
        config.pipeline_mut().set_review_scenes(true);
    }
    let beats = BeatSheet::from_entries(source.beats())?;

    let from = if args.resume {
        resume_point(&repo).await?
    } else {
        if !repo.list_chapters().await?.is_empty() {
            tracing::warn!("Clearing chapters from an earlier run; pass --resume to continue them");
        }
        repo.reset().await?;
        ResumePoint::start()
    };
    let already_saved = from.chapters().len();
    let needs_profile = from.profile().is_none();

    let driver = OpenAIDriver::from_env(config.model().name(), *config.retry().timeout_secs())?;
    let templates = config.prompt_templates()?;
    let mut pipeline = StoryPipeline::new(driver, templates, config);
    if args.no_characters {
        pipeline = pipeline.without_characters();
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing with completed chapters");
            on_interrupt.cancel();
        }
    });

    println!(
        "Generating {} beat(s) for {}",
        beats.len().saturating_sub(from.next_beat()?.saturating_sub(1)),
        args.story.display()
    );

    match pipeline.resume(source.seed(), &beats, from, cancel).await {
        Ok(run) => {
            if needs_profile {
                repo.save_profile(run.profile()).await?;
            }
            save_new_chapters(&repo, run.chapters(), already_saved, &beats, run.reviews())
                .await?;
            let (chapters, characters) = run.into_parts();
            save_characters(&repo, characters).await?;
            println!("Done: {} chapter(s)", chapters.len());
            Ok(())
        }
        Err(aborted) => {
            if needs_profile {
                if let Some(profile) = aborted.profile() {
                    repo.save_profile(profile).await?;
                }
            }
            save_new_chapters(
                &repo,
                aborted.chapters(),
                already_saved,
                &beats,
                aborted.reviews(),
            )
            .await?;
            let (error, chapters, characters) = aborted.into_parts();
            save_characters(&repo, characters).await?;
            eprintln!(
                "Stopped after {} chapter(s); rerun with --resume to continue",
                chapters.len()
            );
            Err(error.into())
        }
    }
}

async fn save_characters(
    repo: &FilesystemStoryRepository,
    characters: Option<FabulaResult<fabula::CharacterRoster>>,
) -> FabulaResult<()> {
    match characters {
        Some(Ok(roster)) => {
            let merged = repo.merge_characters(&roster).await?;
            println!("Characters: {} profile(s) on file", merged.len());
        }
        Some(Err(e)) => tracing::warn!(error = %e, "Character extraction failed"),
        None => {}
    }
    Ok(())
}
