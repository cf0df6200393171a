//! Beat expansion.

use crate::{PromptTemplates, RetryPolicy, generate_with_timeout, is_transient, retry};
use fabula_core::{Beat, GeneratedScene, GenerateRequest, Message, StoryProfile, StyleHints};
use fabula_error::{FabulaError, FabulaResult, StoryError, StoryErrorKind};
use fabula_interface::CompletionDriver;
use tokio_retry2::RetryError;
use tracing::{debug, info, instrument, warn};

/// Stand-in for the story-so-far section before anything has been written.
const EMPTY_CONTEXT: &str = "(Nothing has been written yet. This is the opening scene.)";

/// Turns one beat into a scene of prose.
///
/// Each beat is a single labeled completion request. A blank reply or a
/// transient backend failure is retried per the policy; whatever still
/// fails surfaces as a `Generation` error carrying the beat index.
pub struct BeatExpander<'a, D: ?Sized> {
    driver: &'a D,
    templates: &'a PromptTemplates,
    policy: RetryPolicy,
    temperature: f32,
    max_tokens: u32,
}

impl<'a, D> BeatExpander<'a, D>
where
    D: CompletionDriver + ?Sized,
{
    /// Create an expander with temperature 0.7 and a 1000 token limit.
    pub fn new(driver: &'a D, templates: &'a PromptTemplates, policy: RetryPolicy) -> Self {
        Self {
            driver,
            templates,
            policy,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    /// Override sampling parameters.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Build the completion request for `beat`.
    ///
    /// # Errors
    ///
    /// Returns a `Template` error if the beat template cannot be rendered.
    pub fn request(
        &self,
        beat: &Beat,
        context: &str,
        profile: &StoryProfile,
        hints: &StyleHints,
    ) -> Result<GenerateRequest, StoryError> {
        let context = context.trim();
        let context = if context.is_empty() {
            EMPTY_CONTEXT
        } else {
            context
        };
        let style = profile.style();
        let world = profile.world();
        let pov = hints.pov().to_string();
        let tense = hints.tense().to_string();
        let themes = profile.themes().join(", ");
        let characters = cast_summary(profile);

        let vars = [
            ("language", hints.language().name()),
            ("context", context),
            ("beat", beat.text().as_str()),
            ("tone", style.tone().as_str()),
            ("pacing", style.pacing().as_str()),
            ("narrative_style", style.narrative_style().as_str()),
            ("pov", pov.as_str()),
            ("tense", tense.as_str()),
            ("setting", world.setting().as_str()),
            ("atmosphere", world.atmosphere().as_str()),
            ("themes", themes.as_str()),
            ("characters", characters.as_str()),
        ];
        let prompt = self.templates.beat_prompt(&vars)?;

        Ok(GenerateRequest {
            messages: vec![
                Message::system(self.templates.prose_system().as_str()),
                Message::user(prompt),
            ],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            model: None,
        })
    }

    /// Expand `beat` given the story so far.
    ///
    /// # Errors
    ///
    /// Returns `Generation` for the beat when the backend fails or keeps
    /// returning blank text, and `Template` when the prompt cannot be built.
    #[instrument(
        skip(self, beat, context, profile, hints),
        fields(beat_index = beat.index(), context_chars = context.chars().count())
    )]
    pub async fn expand(
        &self,
        beat: &Beat,
        context: &str,
        profile: &StoryProfile,
        hints: &StyleHints,
    ) -> FabulaResult<GeneratedScene> {
        let beat_index = *beat.index();
        let request = self.request(beat, context, profile, hints)?;
        debug!(prompt_chars = request.prompt_chars(), "Built beat request");

        let text = retry(&self.policy, |attempt| {
            let request = &request;
            async move {
                match generate_with_timeout(self.driver, request, self.policy.timeout()).await {
                    Ok(response) if response.is_blank() => {
                        warn!(attempt, "Blank response for beat");
                        Err(RetryError::Transient {
                            err: generation_error(beat_index, "empty response"),
                            retry_after: None,
                        })
                    }
                    Ok(response) => Ok(response.text),
                    Err(err) if is_transient(&err) => {
                        warn!(attempt, error = %err, "Transient failure expanding beat");
                        Err(RetryError::Transient {
                            err,
                            retry_after: None,
                        })
                    }
                    Err(err) => Err(RetryError::Permanent(err)),
                }
            }
        })
        .await
        .map_err(|err| into_generation_error(beat_index, err))?;

        let text = text.trim().to_string();
        info!(scene_chars = text.chars().count(), "Beat expanded");
        Ok(GeneratedScene::new(beat_index, *hints.language(), text))
    }
}

fn generation_error(beat_index: usize, reason: impl Into<String>) -> FabulaError {
    StoryError::new(StoryErrorKind::Generation {
        beat_index,
        reason: reason.into(),
    })
    .into()
}

fn into_generation_error(beat_index: usize, err: FabulaError) -> FabulaError {
    match err.story_kind() {
        Some(StoryErrorKind::Generation { .. }) => err,
        _ => generation_error(beat_index, err.to_string()),
    }
}

/// One line per sketched character: `Name (role): traits; arc`.
fn cast_summary(profile: &StoryProfile) -> String {
    if profile.characters().is_empty() {
        return "(none established)".to_string();
    }
    profile
        .characters()
        .iter()
        .map(|(name, sketch)| {
            let mut line = format!("{} ({})", name, sketch.role());
            if !sketch.traits().is_empty() {
                line.push_str(": ");
                line.push_str(&sketch.traits().join(", "));
            }
            if !sketch.arc().is_empty() {
                line.push_str("; arc: ");
                line.push_str(sketch.arc());
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fabula_core::{
        CharacterSketch, GenerateResponse, Language, Pov, StyleProfile, Tense, WorldProfile,
    };
    use std::collections::BTreeMap;

    struct Silent;

    #[async_trait]
    impl CompletionDriver for Silent {
        async fn generate(&self, _req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
            Ok(GenerateResponse::text("   "))
        }

        fn provider_name(&self) -> &'static str {
            "silent"
        }

        fn model_name(&self) -> &str {
            "silent"
        }
    }

    fn profile() -> StoryProfile {
        let mut characters = BTreeMap::new();
        characters.insert(
            "Mara".to_string(),
            CharacterSketch::new("keeper", vec!["stubborn".into()], "learns to leave"),
        );
        StoryProfile::new(
            StyleProfile::new("melancholic", "slow", "lyrical"),
            characters,
            WorldProfile::new("a northern lighthouse", vec![], "fog"),
            vec!["isolation".into(), "duty".into()],
        )
    }

    #[test]
    fn request_carries_labeled_sections() {
        let templates = PromptTemplates::default();
        let expander = BeatExpander::new(&Silent, &templates, RetryPolicy::immediate(0));
        let hints = StyleHints::new(Language::Fr, Pov::FirstPerson, Tense::Present);
        let request = expander
            .request(&Beat::new(2, "Mara finds the letter"), "", &profile(), &hints)
            .unwrap();

        let prompt = request.last_user_message().unwrap();
        assert!(prompt.contains("[BEAT TO DRAMATIZE]\nMara finds the letter\n[END BEAT]"));
        assert!(prompt.contains(EMPTY_CONTEXT));
        assert!(prompt.contains("French"));
        assert!(prompt.contains("first person"));
        assert!(prompt.contains("Mara (keeper): stubborn; arc: learns to leave"));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn blank_responses_become_generation_errors() {
        let templates = PromptTemplates::default();
        let expander = BeatExpander::new(&Silent, &templates, RetryPolicy::immediate(1));
        let hints = StyleHints::default();
        let err = expander
            .expand(&Beat::new(4, "The storm breaks"), "Earlier.", &profile(), &hints)
            .await
            .unwrap_err();

        assert_eq!(
            err.story_kind(),
            Some(&StoryErrorKind::Generation {
                beat_index: 4,
                reason: "empty response".to_string()
            })
        );
    }
}
