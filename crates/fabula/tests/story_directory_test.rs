//! A story directory driven through the facade: run, persist, resume.

use async_trait::async_trait;
use fabula::{
    BeatSheet, CompletionDriver, FabulaConfig, FabulaResult, FilesystemStoryRepository,
    GenerateRequest, GenerateResponse, Language, ModelsError, ModelsErrorKind,
    PipelineSettingsBuilder, PromptTemplates, ResumePoint, Role, StoryPipeline, StoryRepository,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

const SEED: &str = "Mara has kept the Skerry Light for thirty years. \
She talks to the lamp as if it were her sister.";

const ANALYSIS: &str = r#"{
  "style": {"tone": "melancholic", "pacing": "slow", "narrative_style": "lyrical"},
  "characters": {"Mara": {"role": "keeper", "traits": ["stubborn"], "arc": "learns to leave"}},
  "world": {"setting": "a northern skerry", "rules": [], "atmosphere": "fog"},
  "themes": ["duty"]
}"#;

const CHARACTERS: &str = r#"{
  "Mara": {"name": "Mara", "role": "protagonist", "friends": ["Ilse"]},
  "Ilse": {"role": "ferrywoman", "friends": ["Mara"]}
}"#;

const REVIEW: &str = r#"{"tone": "bleak", "narrative_voice": "close third", "pacing": "slow",
  "strengths": ["weather"], "suggestions": []}"#;

/// Answers by stage; prose fails permanently from the `fail_from`th call on.
struct StageDriver {
    templates: PromptTemplates,
    prose_calls: AtomicUsize,
    analysis_calls: AtomicUsize,
    fail_from: Option<usize>,
}

impl StageDriver {
    fn new(fail_from: Option<usize>) -> Self {
        Self {
            templates: PromptTemplates::default(),
            prose_calls: AtomicUsize::new(0),
            analysis_calls: AtomicUsize::new(0),
            fail_from,
        }
    }
}

#[async_trait]
impl CompletionDriver for StageDriver {
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        let system = req
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if system == self.templates.analysis_system() {
            self.analysis_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(GenerateResponse::text(ANALYSIS));
        }
        if system == self.templates.extraction_system() {
            return Ok(GenerateResponse::text(CHARACTERS));
        }
        if system == self.templates.review_system() {
            return Ok(GenerateResponse::text(REVIEW));
        }

        let n = self.prose_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_from.is_some_and(|from| n >= from) {
            return Err(ModelsError::new(ModelsErrorKind::Api {
                status: 401,
                message: "invalid key".to_string(),
            })
            .into());
        }
        Ok(GenerateResponse::text(format!(
            "Night {} fell over the skerry. The lamp turned.",
            n
        )))
    }

    fn provider_name(&self) -> &'static str {
        "stage"
    }

    fn model_name(&self) -> &str {
        "stage-model"
    }
}

fn config() -> FabulaConfig {
    FabulaConfig::default().with_pipeline(
        PipelineSettingsBuilder::default()
            .beats_per_chapter(2usize)
            .build()
            .unwrap(),
    )
}

fn write_story(dir: &std::path::Path) {
    std::fs::write(dir.join("story.md"), SEED).unwrap();
    std::fs::write(
        dir.join("beats.toml"),
        r#"language = "en"
beats = [
  "The supply boat is late",
  "Mara rations the oil",
  "A stranger rows ashore",
  "The lamp goes dark",
]
"#,
    )
    .unwrap();
}

#[tokio::test]
async fn interrupted_run_resumes_from_saved_chapters() {
    let dir = tempfile::tempdir().unwrap();
    write_story(dir.path());
    let repo = FilesystemStoryRepository::new(dir.path());

    let source = repo.load_source().await.unwrap();
    assert_eq!(source.language().as_deref(), Some("en"));
    let beats = BeatSheet::from_entries(source.beats()).unwrap();
    assert_eq!(beats.len(), 4);

    // First run: beat 3 fails, chapter 1 (beats 1-2) survives.
    let pipeline = StoryPipeline::new(
        StageDriver::new(Some(3)),
        PromptTemplates::default(),
        config(),
    );
    let aborted = pipeline
        .run(source.seed(), &beats, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(aborted.chapters().len(), 1);
    repo.save_chapter(&aborted.chapters()[0], &beats).await.unwrap();
    repo.save_profile(aborted.profile().as_ref().unwrap())
        .await
        .unwrap();
    let (_, _, characters) = aborted.into_parts();
    repo.merge_characters(&characters.unwrap().unwrap())
        .await
        .unwrap();

    assert_eq!(repo.list_chapters().await.unwrap(), vec![1]);
    let first = repo.load_chapter(1).await.unwrap();
    assert_eq!(first.beat_indices(), &vec![1, 2]);
    assert_eq!(*first.language(), Language::En);

    // Second run picks up at beat 3 with the saved profile.
    let from = ResumePoint::after(vec![first.clone()])
        .with_profile(repo.load_profile().await.unwrap().unwrap());
    let pipeline = StoryPipeline::new(StageDriver::new(None), PromptTemplates::default(), config())
        .without_characters();
    let run = pipeline
        .resume(source.seed(), &beats, from, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pipeline.driver().analysis_calls.load(Ordering::SeqCst), 0);
    assert_eq!(run.chapters().len(), 2);
    assert_eq!(run.chapters()[0], first);
    assert_eq!(*run.chapters()[1].number(), 2);
    assert_eq!(run.chapters()[1].beat_indices(), &vec![3, 4]);

    repo.save_chapter(&run.chapters()[1], &beats).await.unwrap();
    assert_eq!(repo.list_chapters().await.unwrap(), vec![1, 2]);
    assert_eq!(repo.load_chapter(1).await.unwrap(), first);

    let network = repo.character_network().await.unwrap();
    assert_eq!(network.get("Mara"), Some(&vec!["Ilse".to_string()]));
}

#[tokio::test]
async fn fresh_run_after_reset_leaves_no_stale_chapters() {
    let dir = tempfile::tempdir().unwrap();
    write_story(dir.path());
    let repo = FilesystemStoryRepository::new(dir.path());
    let source = repo.load_source().await.unwrap();
    let beats = BeatSheet::from_entries(source.beats()).unwrap();

    // A complete earlier run leaves two chapters, a profile and characters.
    let pipeline = StoryPipeline::new(StageDriver::new(None), PromptTemplates::default(), config());
    let run = pipeline
        .run(source.seed(), &beats, CancellationToken::new())
        .await
        .unwrap();
    for chapter in run.chapters() {
        repo.save_chapter(chapter, &beats).await.unwrap();
    }
    repo.save_profile(run.profile()).await.unwrap();
    let (_, characters) = run.into_parts();
    repo.merge_characters(&characters.unwrap().unwrap())
        .await
        .unwrap();
    assert_eq!(repo.list_chapters().await.unwrap(), vec![1, 2]);

    // A fresh run clears them before it starts, then stops after chapter 1.
    repo.reset().await.unwrap();
    assert!(repo.load_profile().await.unwrap().is_none());
    assert!(repo.load_characters().await.unwrap().is_empty());

    let pipeline = StoryPipeline::new(
        StageDriver::new(Some(3)),
        PromptTemplates::default(),
        config(),
    )
    .without_characters();
    let aborted = pipeline
        .run(source.seed(), &beats, CancellationToken::new())
        .await
        .unwrap_err();
    for chapter in aborted.chapters() {
        repo.save_chapter(chapter, &beats).await.unwrap();
    }

    assert_eq!(repo.list_chapters().await.unwrap(), vec![1]);
    assert!(!dir.path().join("chapters/chapter_2.md").exists());
    assert!(!dir.path().join("chapters/chapter_2_metadata.json").exists());
    assert!(repo.load_characters().await.unwrap().is_empty());

    // Resuming now continues from chapter 1 rather than a stale chapter 2.
    let mut chapters = Vec::new();
    for number in repo.list_chapters().await.unwrap() {
        chapters.push(repo.load_chapter(number).await.unwrap());
    }
    assert_eq!(ResumePoint::after(chapters).next_beat().unwrap(), 3);
}

#[tokio::test]
async fn scene_reviews_are_saved_with_chapter_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_story(dir.path());
    let repo = FilesystemStoryRepository::new(dir.path());
    let source = repo.load_source().await.unwrap();
    let beats = BeatSheet::from_entries(source.beats()).unwrap();

    let mut config = config();
    config.pipeline_mut().set_review_scenes(true);
    let pipeline = StoryPipeline::new(StageDriver::new(None), PromptTemplates::default(), config)
        .without_characters();
    let run = pipeline
        .run(source.seed(), &beats, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.reviews().keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    for chapter in run.chapters() {
        repo.save_reviewed_chapter(chapter, &beats, run.reviews())
            .await
            .unwrap();
    }

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("chapters/chapter_2_metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["scenes"][0]["beat"], "A stranger rows ashore");
    assert_eq!(metadata["scenes"][0]["style_analysis"]["tone"], "bleak");
    assert_eq!(metadata["scenes"][1]["beat_index"], 4);
}
