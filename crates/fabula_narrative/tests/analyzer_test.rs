//! Story analyzer tests.

mod test_utils;

use fabula_error::{ModelsErrorKind, StoryErrorKind};
use fabula_narrative::{PromptTemplates, RetryPolicy, StoryAnalyzer};
use test_utils::{LIGHTHOUSE_SEED, MockDriver, MockResponse, RequestKind, analysis_json};

#[tokio::test]
async fn analysis_decodes_fenced_json() {
    let driver = MockDriver::new().analysis(vec![MockResponse::text(analysis_json())]);
    let templates = PromptTemplates::default();
    let analyzer = StoryAnalyzer::new(&driver, &templates, RetryPolicy::immediate(1));

    let profile = analyzer.analyze(LIGHTHOUSE_SEED).await.unwrap();

    assert_eq!(profile.style().pacing(), "slow");
    assert_eq!(profile.characters()["Mara"].role(), "keeper");
    assert_eq!(profile.world().rules(), &vec!["the lamp must never go dark".to_string()]);
    assert_eq!(profile.themes(), &vec!["isolation".to_string(), "duty".to_string()]);

    let requests = driver.requests(RequestKind::Analysis);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.3));
    assert!(requests[0].last_user_message().unwrap().ends_with(LIGHTHOUSE_SEED));
}

#[tokio::test]
async fn malformed_analysis_is_retried_once_with_reinforcement() {
    let driver = MockDriver::new().analysis(vec![
        MockResponse::text(r#"{"style": {"tone": "grim", "pacing": "fast"}}"#),
        MockResponse::text(analysis_json()),
    ]);
    let templates = PromptTemplates::default();
    let analyzer = StoryAnalyzer::new(&driver, &templates, RetryPolicy::immediate(1));

    let profile = analyzer.analyze(LIGHTHOUSE_SEED).await.unwrap();
    assert_eq!(profile.style().tone(), "melancholic");

    let prompts = driver.prompts(RequestKind::Analysis);
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[1], templates.reinforce(&prompts[0]));
}

#[tokio::test]
async fn second_malformed_analysis_reports_schema_reason() {
    let driver = MockDriver::new().analysis(vec![
        MockResponse::text("not json at all"),
        MockResponse::text(r#"{"themes": []}"#),
    ]);
    let templates = PromptTemplates::default();
    let analyzer = StoryAnalyzer::new(&driver, &templates, RetryPolicy::immediate(1));

    let err = analyzer.analyze(LIGHTHOUSE_SEED).await.unwrap_err();
    match err.story_kind() {
        Some(StoryErrorKind::AnalysisParse { attempts, reason }) => {
            assert_eq!(*attempts, 2);
            assert!(reason.contains("missing field"), "reason: {}", reason);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn backend_errors_pass_through_after_retries() {
    let driver = MockDriver::new().analysis(vec![
        MockResponse::Error(ModelsErrorKind::Api {
            status: 429,
            message: "slow down".to_string(),
        }),
        MockResponse::Error(ModelsErrorKind::Api {
            status: 429,
            message: "slow down".to_string(),
        }),
    ]);
    let templates = PromptTemplates::default();
    let analyzer = StoryAnalyzer::new(&driver, &templates, RetryPolicy::immediate(1));

    let err = analyzer.analyze(LIGHTHOUSE_SEED).await.unwrap_err();
    let models = err.models().expect("backend error");
    assert!(matches!(models.kind, ModelsErrorKind::Api { status: 429, .. }));
    assert_eq!(driver.call_count(RequestKind::Analysis), 2);
}
