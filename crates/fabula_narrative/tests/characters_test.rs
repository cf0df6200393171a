//! Character extractor tests.

mod test_utils;

use fabula_core::{CharacterProfile, CharacterRoster, Relationships};
use fabula_error::StoryErrorKind;
use fabula_narrative::{CharacterExtractor, PromptTemplates, RetryPolicy};
use test_utils::{LIGHTHOUSE_SEED, MockDriver, MockResponse, RequestKind, extraction_json};

#[tokio::test]
async fn extraction_builds_roster_with_alias_index() {
    let driver = MockDriver::new().extraction(vec![MockResponse::text(extraction_json())]);
    let templates = PromptTemplates::default();
    let extractor = CharacterExtractor::new(&driver, &templates, RetryPolicy::immediate(1));

    let roster = extractor.extract(LIGHTHOUSE_SEED).await.unwrap();

    assert_eq!(roster.len(), 2);
    let mara = roster.lookup("The Keeper").unwrap();
    assert_eq!(mara.occupation(), "lighthouse keeper");
    assert_eq!(mara.relationships().family()[0].name(), "Ada");
    assert_eq!(roster.lookup("Ilse").unwrap().role(), "ferrywoman");

    let network = roster.network();
    assert_eq!(network["Mara"], vec!["Ilse".to_string(), "Ada".to_string()]);

    let requests = driver.requests(RequestKind::Extraction);
    assert!(
        requests[0]
            .last_user_message()
            .unwrap()
            .contains("extract a profile for every character")
    );
}

#[tokio::test]
async fn reply_without_object_twice_is_extraction_parse() {
    let driver = MockDriver::new().extraction(vec![
        MockResponse::text("Mara, the keeper."),
        MockResponse::text("[\"Mara\"]"),
    ]);
    let templates = PromptTemplates::default();
    let extractor = CharacterExtractor::new(&driver, &templates, RetryPolicy::immediate(0));

    let err = extractor.extract(LIGHTHOUSE_SEED).await.unwrap_err();
    assert!(matches!(
        err.story_kind(),
        Some(StoryErrorKind::ExtractionParse { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn re_extraction_merges_into_existing_roster() {
    let driver = MockDriver::new().extraction(vec![MockResponse::text(
        r#"{"The Keeper": {"name": "The Keeper", "aliases": ["Mara"], "role": "narrator",
            "occupation": "", "enemies": ["the sea"]}}"#,
    )]);
    let templates = PromptTemplates::default();
    let extractor = CharacterExtractor::new(&driver, &templates, RetryPolicy::immediate(0));

    let mut existing: CharacterRoster = [CharacterProfile::new("Mara", "protagonist")
        .with_occupation("lighthouse keeper")
        .with_relationships(Relationships::new(vec![], vec!["Ilse".into()], vec![], vec![]))]
    .into_iter()
    .collect();
    let fresh = extractor.extract(LIGHTHOUSE_SEED).await.unwrap();
    existing.merge(&fresh);

    assert_eq!(existing.len(), 1);
    let mara = existing.lookup("the keeper").unwrap();
    assert_eq!(mara.name(), "Mara");
    assert_eq!(mara.role(), "protagonist");
    assert_eq!(mara.occupation(), "lighthouse keeper");
    assert_eq!(mara.relationships().friends(), &vec!["Ilse".to_string()]);
    assert_eq!(mara.relationships().enemies(), &vec!["the sea".to_string()]);

    let snapshot = existing.clone();
    existing.merge(&fresh);
    assert_eq!(existing, snapshot);
}
