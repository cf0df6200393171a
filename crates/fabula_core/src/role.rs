//! Message authorship.

use serde::{Deserialize, Serialize};

/// Author of a message sent to the completion backend.
///
/// Pipeline requests carry one `System` message (the stage persona) and one
/// `User` message (the rendered template).
///
/// # Examples
///
/// ```
/// use fabula_core::Role;
///
/// assert_eq!(Role::System.as_str(), "system");
/// assert_eq!(Role::Assistant.to_string(), "assistant");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Stage persona and standing instructions
    #[display("system")]
    System,
    /// The rendered prompt
    #[display("user")]
    User,
    /// Prior model output
    #[display("assistant")]
    Assistant,
}

impl Role {
    /// Chat-completions wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}
