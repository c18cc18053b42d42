use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation as it is sent to the webhook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    Assistant,
    User,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Sender::Assistant => "🤖 AI Assistant",
            Sender::User => "You",
        }
    }
}

/// A rendered line of the chat log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub sender: Sender,
    pub text: String,
    /// Placeholder shown while a reply is outstanding.
    pub pending: bool,
}

impl LogEntry {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            pending: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            pending: false,
        }
    }
}
