//! Tests for the filesystem story repository.

use fabula_core::{
    BeatSheet, Chapter, CharacterProfile, CharacterRoster, Language, Relationships, SceneReview,
    StoryProfile, StyleProfile, WorldProfile,
};
use fabula_error::FabulaErrorKind;
use fabula_interface::StoryRepository;
use fabula_storage::FilesystemStoryRepository;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn story_dir() -> (TempDir, FilesystemStoryRepository) {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("story.md"),
        "Mara keeps the light.\nThe boat is late.",
    )
    .unwrap();
    std::fs::write(
        temp_dir.path().join("beats.toml"),
        "language = \"en\"\nbeats = [\"# Landfall\", \"She rows ashore\", \"She climbs\"]\n",
    )
    .unwrap();
    let repo = FilesystemStoryRepository::new(temp_dir.path());
    (temp_dir, repo)
}

#[tokio::test]
async fn test_load_source() {
    let (_dir, repo) = story_dir();
    let source = repo.load_source().await.unwrap();

    assert_eq!(source.seed(), "Mara keeps the light.\nThe boat is late.");
    assert_eq!(source.beats().len(), 3);
    assert_eq!(source.language().as_deref(), Some("en"));
}

#[tokio::test]
async fn test_missing_beats_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("story.md"), "seed").unwrap();
    let repo = FilesystemStoryRepository::new(temp_dir.path());

    let err = repo.load_source().await.unwrap_err();
    match err.kind() {
        FabulaErrorKind::Storage(e) => assert!(e.is_not_found()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_chapter_round_trip_and_listing() {
    let (dir, repo) = story_dir();
    let source = repo.load_source().await.unwrap();
    let sheet = BeatSheet::from_entries(source.beats()).unwrap();

    assert!(repo.list_chapters().await.unwrap().is_empty());

    let second = Chapter::new(2, None, Language::En, vec![2], "They climb.");
    let first = Chapter::new(
        1,
        Some("Landfall".to_string()),
        Language::En,
        vec![1],
        "They row ashore.\n\nThe sand is cold.",
    );
    repo.save_chapter(&second, &sheet).await.unwrap();
    repo.save_chapter(&first, &sheet).await.unwrap();

    assert_eq!(repo.list_chapters().await.unwrap(), vec![1, 2]);
    assert_eq!(repo.load_chapter(1).await.unwrap(), first);
    assert_eq!(repo.load_chapter(2).await.unwrap(), second);

    let markdown = std::fs::read_to_string(dir.path().join("chapters/chapter_1.md")).unwrap();
    assert!(markdown.starts_with("# Chapter 1: Landfall\n\n"));

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("chapters/chapter_1_metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["beats"][0], "She rows ashore");
    assert_eq!(metadata["language"], "en");
    assert!(metadata["created_at"].is_string());
}

#[tokio::test]
async fn test_profile_is_optional_until_saved() {
    let (_dir, repo) = story_dir();
    assert!(repo.load_profile().await.unwrap().is_none());

    let profile = StoryProfile::new(
        StyleProfile::new("quiet", "slow", "lyrical"),
        BTreeMap::new(),
        WorldProfile::new("a skerry", vec!["the lamp stays lit".into()], "fog"),
        vec!["duty".into()],
    );
    repo.save_profile(&profile).await.unwrap();
    assert_eq!(repo.load_profile().await.unwrap(), Some(profile));
}

#[tokio::test]
async fn test_characters_merge_on_save() {
    let (_dir, repo) = story_dir();
    assert!(repo.load_characters().await.unwrap().is_empty());

    let first: CharacterRoster = [CharacterProfile::new("Mara", "keeper")
        .with_relationships(Relationships::new(vec![], vec!["Ilse".into()], vec![], vec![]))]
    .into_iter()
    .collect();
    repo.merge_characters(&first).await.unwrap();

    let second: CharacterRoster = [
        CharacterProfile::new("Mara", "protagonist").with_relationships(Relationships::new(
            vec![],
            vec!["Ilse".into(), "Ada".into()],
            vec![],
            vec![],
        )),
        CharacterProfile::new("Ilse", "ferrywoman"),
    ]
    .into_iter()
    .collect();
    let merged = repo.merge_characters(&second).await.unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(merged.lookup("Mara").unwrap().role(), "keeper");
    assert_eq!(repo.load_characters().await.unwrap(), merged);

    let network = repo.character_network().await.unwrap();
    assert_eq!(network["Mara"], vec!["Ilse".to_string(), "Ada".to_string()]);
    assert!(network["Ilse"].is_empty());
}

#[tokio::test]
async fn test_reviewed_chapter_records_scene_analysis() {
    let (dir, repo) = story_dir();
    let sheet = BeatSheet::from_entries(repo.load_source().await.unwrap().beats()).unwrap();
    let chapter = Chapter::new(1, None, Language::En, vec![1, 2], "They row.\n\n---\n\nThey climb.");

    let mut reviews = BTreeMap::new();
    reviews.insert(
        2,
        SceneReview::new("tense", "close third", "brisk").with_notes(
            "consistent",
            vec!["sharp verbs".into()],
            vec!["slow the climb".into()],
        ),
    );
    repo.save_reviewed_chapter(&chapter, &sheet, &reviews)
        .await
        .unwrap();

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("chapters/chapter_1_metadata.json")).unwrap(),
    )
    .unwrap();
    let scenes = metadata["scenes"].as_array().unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0]["beat"], "She rows ashore");
    assert!(scenes[0].get("style_analysis").is_none());
    assert_eq!(scenes[1]["style_analysis"]["pacing"], "brisk");
    assert_eq!(scenes[1]["style_analysis"]["suggestions"][0], "slow the climb");

    assert_eq!(repo.load_chapter(1).await.unwrap(), chapter);
}

#[tokio::test]
async fn test_reset_clears_generated_artifacts_only() {
    let (dir, repo) = story_dir();
    let sheet = BeatSheet::from_entries(repo.load_source().await.unwrap().beats()).unwrap();
    repo.save_chapter(&Chapter::new(1, None, Language::En, vec![1], "They row."), &sheet)
        .await
        .unwrap();
    repo.save_profile(&StoryProfile::new(
        StyleProfile::new("quiet", "slow", "lyrical"),
        BTreeMap::new(),
        WorldProfile::new("a skerry", vec![], "fog"),
        vec![],
    ))
    .await
    .unwrap();
    let roster: CharacterRoster = [CharacterProfile::new("Mara", "keeper")].into_iter().collect();
    repo.merge_characters(&roster).await.unwrap();

    repo.reset().await.unwrap();

    assert!(repo.list_chapters().await.unwrap().is_empty());
    assert!(repo.load_profile().await.unwrap().is_none());
    assert!(repo.load_characters().await.unwrap().is_empty());
    assert!(dir.path().join("story.md").exists());
    assert_eq!(repo.load_source().await.unwrap().beats().len(), 3);

    // Nothing left to remove is fine.
    repo.reset().await.unwrap();
}
