//! Chat-completions wire format and HTTP client.
//!
//! Any server that accepts `POST {base}/chat/completions` with a bearer key
//! works: OpenAI itself, or a local gateway that mimics it.

mod client;
mod dto;

pub use client::ChatCompletionsClient;
pub use dto::{ChatCompletion, ChatRequest, WireMessage};
