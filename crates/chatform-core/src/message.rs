use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user (typed or finalized speech input).
    User,
    /// The conversational bot.
    Bot,
    /// A synthetic message describing a send or transport failure.
    Error,
}

impl Role {
    /// Stable lowercase name, used in message ids and transcript digests.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
            Role::Error => "error",
        }
    }
}

/// A single finalized turn within a conversation.
///
/// Messages are immutable once created. The id is namespaced by the producer
/// kind (`user_*`, `bot_*`, `error_*`, `welcome_*`) to aid debugging; ids are
/// never reused. Content is trimmed at construction — persisted messages are
/// always non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique identifier, namespaced by producer kind.
    pub id: String,
    /// The role of the message author.
    pub role: Role,
    /// The trimmed textual content of the message.
    pub content: String,
    /// UTC timestamp of when the message became final.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_namespace(namespace: &str, role: Role, content: &str) -> Self {
        Self {
            id: format!("{}_{}", namespace, Uuid::new_v4()),
            role,
            content: content.trim().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a finalized user message (typed input or final speech).
    pub fn user(content: &str) -> Self {
        Self::with_namespace("user", Role::User, content)
    }

    /// Creates a finalized bot message.
    pub fn bot(content: &str) -> Self {
        Self::with_namespace("bot", Role::Bot, content)
    }

    /// Creates a synthetic error message describing a failure the user
    /// should see inline in the conversation.
    pub fn error(content: &str) -> Self {
        Self::with_namespace("error", Role::Error, content)
    }

    /// Creates the one-time welcome message shown when a session starts
    /// with no prior history. Bot role, `welcome_` id namespace.
    pub fn welcome(content: &str) -> Self {
        Self::with_namespace("welcome", Role::Bot, content)
    }

    /// Whether the trimmed content is empty. Empty messages are dropped by
    /// the aggregator and never appended to a transcript.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
