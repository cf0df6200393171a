//! Request and response bodies for the chat-completions endpoint.
//!
//! Requests borrow from the [`GenerateRequest`] they were built from; only
//! the reply is owned.

use fabula_core::{GenerateRequest, GenerateResponse, TokenUsage};
use fabula_error::{ModelsError, ModelsErrorKind, ModelsResult};
use serde::{Deserialize, Serialize};

/// One outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireMessage<'a> {
    /// `system`, `user`, or `assistant`
    pub role: &'static str,
    /// Message text
    pub content: &'a str,
}

/// Body of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// Conversation, system message first
    pub messages: Vec<WireMessage<'a>>,
    /// Completion token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl<'a> ChatRequest<'a> {
    /// Build the wire body for `req`, falling back to `default_model` when
    /// the request names none.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when `req` has no messages.
    pub fn from_generate(req: &'a GenerateRequest, default_model: &'a str) -> ModelsResult<Self> {
        if req.messages.is_empty() {
            return Err(ModelsError::new(ModelsErrorKind::InvalidRequest(
                "request has no messages".to_string(),
            )));
        }
        Ok(Self {
            model: req.model.as_deref().unwrap_or(default_model),
            messages: req
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: Reply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Reply {
    // Some gateways send `null` content for refusals.
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

/// Body of a successful chat-completions reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ChatCompletion {
    /// Why the first choice stopped (`stop`, `length`, ...), if reported.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first()?.finish_reason.as_deref()
    }

    /// Convert into the driver-neutral response.
    ///
    /// # Errors
    ///
    /// Returns `ResponseParsing` when the reply has no choices.
    pub fn into_response(self) -> ModelsResult<GenerateResponse> {
        let usage = self.usage.and_then(|u| {
            Some(TokenUsage {
                prompt_tokens: u.prompt_tokens?,
                completion_tokens: u.completion_tokens?,
            })
        });
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            ModelsError::new(ModelsErrorKind::ResponseParsing(
                "reply has no choices".to_string(),
            ))
        })?;
        Ok(GenerateResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
        })
    }
}

/// Error bodies come as `{"error": {"message": ..}}` or `{"error": ".."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { error: ErrorDetail },
    Plain { error: String },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// The message to report for a non-success reply body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Detailed { error }) => error.message,
        Ok(ErrorBody::Plain { error }) => error,
        Err(_) => body.trim().to_string(),
    }
}
