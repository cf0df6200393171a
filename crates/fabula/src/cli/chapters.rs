//! Saved chapter command handlers.

use fabula::{FilesystemStoryRepository, StoryRepository};
use std::path::Path;

/// Print the heading of every saved chapter.
pub async fn list_chapters(story: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let repo = FilesystemStoryRepository::new(story);
    let numbers = repo.list_chapters().await?;
    if numbers.is_empty() {
        println!("No chapters saved in {}", story.display());
        return Ok(());
    }
    for number in numbers {
        let chapter = repo.load_chapter(number).await?;
        println!(
            "{}  (beats {})",
            chapter.heading(),
            chapter
                .beat_indices()
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

/// Print one saved chapter.
pub async fn show_chapter(story: &Path, number: usize) -> Result<(), Box<dyn std::error::Error>> {
    let repo = FilesystemStoryRepository::new(story);
    let chapter = repo.load_chapter(number).await?;
    println!("{}\n\n{}", chapter.heading(), chapter.text());
    Ok(())
}
