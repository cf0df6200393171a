//! OpenAI chat completions driver.

use crate::openai_compat::ChatCompletionsClient;
use async_trait::async_trait;
use fabula_core::{GenerateRequest, GenerateResponse};
use fabula_error::{FabulaResult, ModelsError, ModelsErrorKind, ModelsResult};
use fabula_interface::CompletionDriver;
use tracing::{debug, instrument};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Public OpenAI endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI (or compatible) chat completions driver.
#[derive(Debug, Clone)]
pub struct OpenAIDriver {
    inner: ChatCompletionsClient,
}

impl OpenAIDriver {
    /// Creates a driver from the environment.
    ///
    /// Reads the key from `OPENAI_API_KEY` and the endpoint root from
    /// `OPENAI_BASE_URL`, falling back to [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not set.
    #[instrument(fields(model = %model.as_ref()), skip(model))]
    pub fn from_env(model: impl AsRef<str>, timeout_secs: u64) -> ModelsResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ModelsError::new(ModelsErrorKind::MissingApiKey("OPENAI_API_KEY".to_string()))
        })?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self::with_endpoint(api_key, model.as_ref(), &base_url, timeout_secs)
    }

    /// Creates a driver with an explicit key and endpoint root.
    ///
    /// `base_url` may be the API root (`.../v1`) or the full
    /// `.../chat/completions` endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be initialized.
    #[instrument(skip(api_key), fields(model = %model))]
    pub fn with_endpoint(
        api_key: String,
        model: &str,
        base_url: &str,
        timeout_secs: u64,
    ) -> ModelsResult<Self> {
        let endpoint = chat_endpoint(base_url);
        debug!(endpoint = %endpoint, "Resolved chat completions endpoint");

        let inner = ChatCompletionsClient::new(endpoint, api_key, model, timeout_secs)?;

        Ok(Self { inner })
    }

    /// The resolved chat completions URL.
    pub fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

fn chat_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[async_trait]
impl CompletionDriver for OpenAIDriver {
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        Ok(self.inner.complete(req).await?)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_chat_path_once() {
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:8080/v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
