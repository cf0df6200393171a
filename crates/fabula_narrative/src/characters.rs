//! Character profile extraction.

use crate::structured::{StructuredCall, StructuredFailure, request_structured};
use crate::{DecodeFailure, PromptTemplates, RetryPolicy, decode_json};
use fabula_core::{CharacterProfile, CharacterRoster};
use fabula_error::{FabulaResult, StoryError, StoryErrorKind};
use fabula_interface::CompletionDriver;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

/// Builds a [`CharacterRoster`] from the seed text.
///
/// Runs independently of the beat loop and never touches the context
/// window.
pub struct CharacterExtractor<'a, D: ?Sized> {
    driver: &'a D,
    templates: &'a PromptTemplates,
    policy: RetryPolicy,
    temperature: f32,
    max_tokens: u32,
}

impl<'a, D> CharacterExtractor<'a, D>
where
    D: CompletionDriver + ?Sized,
{
    /// Create an extractor with temperature 0.3 and a 1000 token limit.
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

    /// Extract character profiles from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionParse` when two replies in a row contain no usable
    /// object, or the backend error once its retries are exhausted.
    #[instrument(skip(self, seed), fields(seed_chars = seed.chars().count()))]
    pub async fn extract(&self, seed: &str) -> FabulaResult<CharacterRoster> {
        let call = StructuredCall {
            system: self.templates.extraction_system(),
            prompt: self.templates.extraction_prompt(seed)?,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let roster = request_structured(
            self.driver,
            self.templates,
            &self.policy,
            call,
            decode_roster,
        )
        .await
        .map_err(|failure| match failure {
            StructuredFailure::Backend(err) => err,
            StructuredFailure::Parse { attempts, reason } => {
                StoryError::new(StoryErrorKind::ExtractionParse { attempts, reason }).into()
            }
        })?;

        info!(characters = roster.len(), "Characters extracted");
        Ok(roster)
    }
}

/// Decode a name-keyed object of profiles, skipping malformed entries.
///
/// An entry without a `name` takes its key as the name. A wrapping
/// `{"characters": {...}}` object is unwrapped. A non-empty object in which
/// no entry decodes counts as a schema failure.
pub fn decode_roster(response: &str) -> Result<CharacterRoster, DecodeFailure> {
    let mut entries: Map<String, Value> = decode_json(response)?;
    if entries.len() == 1 && matches!(entries.get("characters"), Some(Value::Object(_))) {
        if let Some(Value::Object(inner)) = entries.remove("characters") {
            entries = inner;
        }
    }

    let total = entries.len();
    let mut roster = CharacterRoster::new();
    for (key, mut value) in entries {
        if let Value::Object(fields) = &mut value {
            fields
                .entry("name")
                .or_insert_with(|| Value::String(key.clone()));
        }
        match serde_json::from_value::<CharacterProfile>(value) {
            Ok(profile) => {
                if !roster.insert(profile) {
                    warn!(entry = %key, "Skipping character entry with empty name or role");
                }
            }
            Err(e) => warn!(entry = %key, error = %e, "Skipping malformed character entry"),
        }
    }

    if total > 0 && roster.is_empty() {
        return Err(DecodeFailure::Schema(format!(
            "none of {} character entries matched the profile schema",
            total
        )));
    }
    Ok(roster)
}
