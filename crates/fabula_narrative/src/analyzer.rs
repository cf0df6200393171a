//! Story profile analysis.

use crate::structured::{StructuredCall, StructuredFailure, request_structured};
use crate::{PromptTemplates, RetryPolicy, decode_json};
use fabula_core::StoryProfile;
use fabula_error::{FabulaResult, StoryError, StoryErrorKind};
use fabula_interface::CompletionDriver;
use tracing::{info, instrument};

/// Extracts a [`StoryProfile`] from the seed text.
///
/// Sends the seed through the analysis template and strictly decodes the
/// reply. A reply that does not decode is asked for once more with the
/// reinforcement suffix; a second failure is an `AnalysisParse` error.
pub struct StoryAnalyzer<'a, D: ?Sized> {
    driver: &'a D,
    templates: &'a PromptTemplates,
    policy: RetryPolicy,
    temperature: f32,
    max_tokens: u32,
}

impl<'a, D> StoryAnalyzer<'a, D>
where
    D: CompletionDriver + ?Sized,
{
    /// Create an analyzer with temperature 0.3 and a 1000 token limit.
    pub fn new(driver: &'a D, templates: &'a PromptTemplates, policy: RetryPolicy) -> Self {
        Self {
            driver,
            templates,
            policy,
            temperature: 0.3,
            max_tokens: 1000,
        }
    }

    /// Override sampling parameters.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Analyze `seed` into a story profile.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisParse` after two undecodable replies, a `Template`
    /// error if the analysis template cannot be rendered, or the backend
    /// error once its retries are exhausted.
    #[instrument(
        skip(self, seed),
        fields(seed_chars = seed.chars().count(), provider = self.driver.provider_name())
    )]
    pub async fn analyze(&self, seed: &str) -> FabulaResult<StoryProfile> {
        let call = StructuredCall {
            system: self.templates.analysis_system(),
            prompt: self.templates.analysis_prompt(seed)?,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let profile = request_structured(
            self.driver,
            self.templates,
            &self.policy,
            call,
            decode_json::<StoryProfile>,
        )
        .await
        .map_err(|failure| match failure {
            StructuredFailure::Backend(err) => err,
            StructuredFailure::Parse { attempts, reason } => {
                StoryError::new(StoryErrorKind::AnalysisParse { attempts, reason }).into()
            }
        })?;

        info!(
            characters = profile.characters().len(),
            themes = profile.themes().len(),
            "Story analyzed"
        );
        Ok(profile)
    }
}
