//! Trait definitions for completion backends.

use async_trait::async_trait;
use fabula_core::{GenerateRequest, GenerateResponse};
use fabula_error::FabulaResult;

/// The single call-out seam: anything that turns a prompt into text.
///
/// Implementations must be safe to share between the beat loop and the
/// character extractor, which call it concurrently.
#[async_trait]
pub trait CompletionDriver: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse>;

    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g., "gpt-3.5-turbo").
    fn model_name(&self) -> &str;
}
