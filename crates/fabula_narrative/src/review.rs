//! Per-scene style review.

use crate::structured::{StructuredCall, StructuredFailure, request_structured};
use crate::{PromptTemplates, RetryPolicy, decode_json};
use fabula_core::{GeneratedScene, SceneReview};
use fabula_error::{FabulaResult, StoryError, StoryErrorKind};
use fabula_interface::CompletionDriver;
use tracing::{debug, instrument};

/// Asks an editor persona for a [`SceneReview`] of one generated scene.
///
/// Reviews are advisory. The pipeline stores them with the chapter metadata
/// and never lets a failed review stop the run.
pub struct SceneReviewer<'a, D: ?Sized> {
    driver: &'a D,
    templates: &'a PromptTemplates,
    policy: RetryPolicy,
    temperature: f32,
    max_tokens: u32,
}

impl<'a, D> SceneReviewer<'a, D>
where
    D: CompletionDriver + ?Sized,
{
    /// Create a reviewer with temperature 0.3 and a 1000 token limit.
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

    /// Review the style of `scene`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewParse` carrying the scene's beat index after two
    /// undecodable replies, or the backend error once its retries are
    /// exhausted.
    #[instrument(
        skip(self, scene),
        fields(beat = scene.beat_index(), chars = scene.text().chars().count())
    )]
    pub async fn review(&self, scene: &GeneratedScene) -> FabulaResult<SceneReview> {
        let call = StructuredCall {
            system: self.templates.review_system(),
            prompt: self.templates.review_prompt(scene.text())?,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let review = request_structured(
            self.driver,
            self.templates,
            &self.policy,
            call,
            decode_json::<SceneReview>,
        )
        .await
        .map_err(|failure| match failure {
            StructuredFailure::Backend(err) => err,
            StructuredFailure::Parse { attempts, reason } => {
                StoryError::new(StoryErrorKind::ReviewParse {
                    beat_index: *scene.beat_index(),
                    attempts,
                    reason,
                })
                .into()
            }
        })?;

        debug!(tone = %review.tone(), suggestions = review.suggestions().len(), "Scene reviewed");
        Ok(review)
    }
}
