//! Completion calls that must come back as JSON.

use crate::{DecodeFailure, PromptTemplates, RetryPolicy, generate_with_retry};
use fabula_core::{GenerateRequest, Message};
use fabula_error::FabulaError;
use fabula_interface::CompletionDriver;
use tracing::{debug, warn};

/// Attempts per structured call: the plain prompt, then once reinforced.
pub(crate) const PARSE_ATTEMPTS: u32 = 2;

/// One structured request.
pub(crate) struct StructuredCall<'a> {
    pub(crate) system: &'a str,
    pub(crate) prompt: String,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: u32,
}

/// Why a structured call produced nothing usable.
pub(crate) enum StructuredFailure {
    /// The backend failed after its own retries
    Backend(FabulaError),
    /// Every attempt returned text that did not decode
    Parse { attempts: u32, reason: String },
}

/// Send `call`, decoding the reply with `decode`.
///
/// A reply that fails to decode is asked for again once with the
/// reinforcement suffix appended to the prompt.
pub(crate) async fn request_structured<D, T, F>(
    driver: &D,
    templates: &PromptTemplates,
    policy: &RetryPolicy,
    call: StructuredCall<'_>,
    decode: F,
) -> Result<T, StructuredFailure>
where
    D: CompletionDriver + ?Sized,
    F: Fn(&str) -> Result<T, DecodeFailure>,
{
    let mut last_failure = None;
    for attempt in 1..=PARSE_ATTEMPTS {
        let prompt = if attempt == 1 {
            call.prompt.clone()
        } else {
            templates.reinforce(&call.prompt)
        };
        let request = GenerateRequest {
            messages: vec![Message::system(call.system), Message::user(prompt)],
            max_tokens: Some(call.max_tokens),
            temperature: Some(call.temperature),
            model: None,
        };

        let response = generate_with_retry(driver, &request, policy)
            .await
            .map_err(StructuredFailure::Backend)?;

        match decode(&response.text) {
            Ok(value) => {
                debug!(attempt, "Decoded structured response");
                return Ok(value);
            }
            Err(failure) => {
                warn!(attempt, %failure, "Structured response unusable");
                last_failure = Some(failure);
            }
        }
    }

    Err(StructuredFailure::Parse {
        attempts: PARSE_ATTEMPTS,
        reason: last_failure.map(|f| f.to_string()).unwrap_or_default(),
    })
}
