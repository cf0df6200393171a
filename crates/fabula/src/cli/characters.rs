//! Character extraction command handler.

use fabula::{
    FabulaConfig, FilesystemStoryRepository, OpenAIDriver, StoryPipeline, StoryRepository,
};
use std::path::Path;

/// Extract characters from the seed and merge them into the story directory.
pub async fn extract_characters(
    config: FabulaConfig,
    story: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = FilesystemStoryRepository::new(story);
    let source = repo.load_source().await?;

    let driver = OpenAIDriver::from_env(config.model().name(), *config.retry().timeout_secs())?;
    let templates = config.prompt_templates()?;
    let pipeline = StoryPipeline::new(driver, templates, config);

    let extracted = pipeline.extractor().extract(source.seed()).await?;
    let merged = repo.merge_characters(&extracted).await?;

    for (name, related) in merged.network() {
        if related.is_empty() {
            println!("{}", name);
        } else {
            println!("{} → {}", name, related.join(", "));
        }
    }
    println!(
        "Extracted {}, {} profile(s) on file",
        extracted.len(),
        merged.len()
    );
    Ok(())
}
