//! HTTP transport for the chat-completions endpoint.

use super::dto::{self, ChatCompletion, ChatRequest};
use fabula_core::{GenerateRequest, GenerateResponse};
use fabula_error::{ModelsError, ModelsErrorKind, ModelsResult};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Posts chat-completions requests to one endpoint with one key.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl ChatCompletionsClient {
    /// Create a client; `endpoint` is the full `.../chat/completions` URL.
    ///
    /// # Errors
    ///
    /// Returns an `Http` error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> ModelsResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelsError::new(ModelsErrorKind::Http(e.to_string())))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs,
        })
    }

    /// Model sent when a request names none.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one completion request.
    ///
    /// # Errors
    ///
    /// Transport failures map to `Http` or `Timeout`, non-success statuses to
    /// `Api` (with the server's error message), and undecodable bodies to
    /// `ResponseParsing`.
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = req.prompt_chars()))]
    pub async fn complete(&self, req: &GenerateRequest) -> ModelsResult<GenerateResponse> {
        let body = ChatRequest::from_generate(req, &self.model)?;

        let reply = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = reply.status();
        if !status.is_success() {
            let text = reply.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }

        let completion: ChatCompletion = reply.json().await.map_err(|e| {
            ModelsError::new(ModelsErrorKind::ResponseParsing(e.to_string()))
        })?;
        if completion.finish_reason() == Some("length") {
            warn!("Completion stopped at the token limit");
        }
        let response = completion.into_response()?;
        debug!(
            chars = response.text.chars().count(),
            completion_tokens = response.usage.map(|u| u.completion_tokens),
            "Completion received"
        );
        Ok(response)
    }

    fn transport_error(&self, e: reqwest::Error) -> ModelsError {
        let err = if e.is_timeout() {
            ModelsError::new(ModelsErrorKind::Timeout(self.timeout_secs))
        } else {
            ModelsError::new(ModelsErrorKind::Http(e.to_string()))
        };
        warn!(error = %err.kind, retryable = err.kind.is_retryable(), "Request failed");
        err
    }
}

fn api_error(status: StatusCode, body: &str) -> ModelsError {
    let err = ModelsError::new(ModelsErrorKind::Api {
        status: status.as_u16(),
        message: dto::error_message(body),
    });
    warn!(
        status = status.as_u16(),
        retryable = err.kind.is_retryable(),
        error = %err.kind,
        "API returned an error"
    );
    err
}
