//! Request and response types for text completion.

use crate::Message;
use serde::{Deserialize, Serialize};

/// A completion request handed to a completion driver.
///
/// Field values left as `None` fall back to the driver's defaults.
///
/// # Examples
///
/// ```
/// use fabula_core::{GenerateRequestBuilder, Message};
///
/// let request = GenerateRequestBuilder::default()
///     .messages(vec![
///         Message::system("You are a creative writing assistant."),
///         Message::user("Write the opening scene."),
///     ])
///     .temperature(Some(0.7))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.messages.len(), 2);
/// assert_eq!(request.max_tokens, None);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct GenerateRequest {
    /// The conversation messages to send
    pub messages: Vec<Message>,
    /// Maximum number of tokens to generate
    #[builder(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[builder(default)]
    pub temperature: Option<f32>,
    /// Model identifier override
    #[builder(default)]
    pub model: Option<String>,
}

impl GenerateRequest {
    /// Total characters across all message bodies.
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }

    /// The last user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens produced in the completion
    pub completion_tokens: u32,
}

/// The completion returned by a driver.
///
/// # Examples
///
/// ```
/// use fabula_core::GenerateResponse;
///
/// let response = GenerateResponse::text("The lamp went dark.");
/// assert_eq!(response.text, "The lamp went dark.");
/// assert!(response.usage.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated text
    pub text: String,
    /// Token usage, when the backend reports it
    pub usage: Option<TokenUsage>,
}

impl GenerateResponse {
    /// A response carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    /// Whether the response has no visible content.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
