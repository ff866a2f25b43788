//! Conversation messages
//!
//! A research run starts from a human message history and ends with a single
//! assistant message carrying the cited answer.

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    /// Label used when rendering a conversation transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single conversation message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Render the research topic for a message history.
///
/// A single message is used verbatim; longer histories become a transcript
/// with one `User: ...` / `Assistant: ...` line per message.
pub fn research_topic(messages: &[Message]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }

    messages
        .iter()
        .map(|m| format!("{}: {}\n", m.role.label(), m.content))
        .collect()
}
