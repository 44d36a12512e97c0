//! Memory record model used by stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use trawl_protocol::ConversationId;

/// Who wrote a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Agent,
}

/// What a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A conversational turn.
    Chat,
    /// The rendered result of a crawl (synthesis plus pages visited).
    Crawl,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Agent => f.write_str("agent"),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => f.write_str("chat"),
            Self::Crawl => f.write_str("crawl"),
        }
    }
}

/// Persisted memory record. Content never changes after the write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Monotonic id within the conversation, assigned on append.
    pub id: u64,
    pub conversation_id: ConversationId,
    pub author: Author,
    pub kind: RecordKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Persistent records are never pruned.
    pub persistent: bool,
}

/// A record before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemoryRecord {
    pub conversation_id: ConversationId,
    pub author: Author,
    pub kind: RecordKind,
    pub content: String,
    pub persistent: bool,
}

impl NewMemoryRecord {
    /// A user chat turn.
    pub fn user(conversation_id: impl Into<ConversationId>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            author: Author::User,
            kind: RecordKind::Chat,
            content: content.into(),
            persistent: false,
        }
    }

    /// An agent chat reply.
    pub fn agent(conversation_id: impl Into<ConversationId>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            author: Author::Agent,
            kind: RecordKind::Chat,
            content: content.into(),
            persistent: false,
        }
    }

    /// A crawl rendering written by the agent; kept through pruning.
    pub fn crawl(conversation_id: impl Into<ConversationId>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            author: Author::Agent,
            kind: RecordKind::Crawl,
            content: content.into(),
            persistent: true,
        }
    }

    /// Override the persistence flag.
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Stamp the record with its id and creation time.
    pub(crate) fn into_record(self, id: u64, created_at: DateTime<Utc>) -> MemoryRecord {
        MemoryRecord {
            id,
            conversation_id: self.conversation_id,
            author: self.author,
            kind: self.kind,
            content: self.content,
            created_at,
            persistent: self.persistent,
        }
    }
}
