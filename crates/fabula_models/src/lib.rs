//! Completion backend integrations for Fabula.
//!
//! The pipeline only needs plain chat completions, so a single
//! OpenAI-compatible client covers OpenAI itself and any server that speaks
//! the same format (set `OPENAI_BASE_URL`).
//!
//! ```no_run
//! use fabula_core::{GenerateRequest, Message};
//! use fabula_interface::CompletionDriver;
//! use fabula_models::OpenAIDriver;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = OpenAIDriver::from_env("gpt-3.5-turbo", 60)?;
//! let request = GenerateRequest {
//!     messages: vec![Message::user("Describe a lighthouse at dusk.")],
//!     ..Default::default()
//! };
//! let response = driver.generate(&request).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod openai;
mod openai_compat;

pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIDriver};
pub use openai_compat::{ChatCompletion, ChatCompletionsClient, ChatRequest, WireMessage};
