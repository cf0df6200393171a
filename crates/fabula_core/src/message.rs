//! Message types for completion requests.

use crate::Role;
use serde::{Deserialize, Serialize};

/// A single text message in a completion request.
///
/// # Examples
///
/// ```
/// use fabula_core::{Message, Role};
///
/// let message = Message::user("Expand this beat.");
/// assert_eq!(message.role, Role::User);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The message text
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}
