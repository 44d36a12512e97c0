//! Wire protocol types shared by the trawl crates: conversation ids, replies and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a conversation (a chat id on the transport side).
pub type ConversationId = String;

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Answered without browsing (from memory or as plain chat).
    Answered,
    /// Answered from the result of a fresh crawl.
    Crawled,
}

/// Reply returned by the decision router for one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Path that produced the reply.
    pub kind: ReplyKind,
    /// Reply text handed to the dispatcher.
    pub text: String,
}

impl Reply {
    /// Build an answered reply.
    pub fn answered(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Answered,
            text: text.into(),
        }
    }

    /// Build a crawled reply.
    pub fn crawled(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Crawled,
            text: text.into(),
        }
    }
}

/// Branch chosen by the router for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Prior crawl memory answers the question.
    Memory,
    /// A new crawl was required.
    Crawl,
    /// No URL and no crawl memory: plain chat turn.
    Chat,
}

/// Wrapper for events emitted while handling a conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Conversation the event belongs to.
    pub conversation_id: ConversationId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

impl EventMsg {
    /// Stamp a payload with a fresh id and the current time.
    pub fn new(conversation_id: impl Into<ConversationId>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.into(),
            created_at: Utc::now(),
            payload,
        }
    }
}

/// All events emitted by the crawl orchestrator and router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// A crawl began at the given seed.
    CrawlStarted {
        seed_url: String,
        max_pages: usize,
        max_depth: usize,
    },
    /// A page was fetched successfully.
    PageVisited {
        url: String,
        depth: usize,
        title: String,
        links: usize,
    },
    /// A non-seed page failed to fetch.
    PageFailed {
        url: String,
        depth: usize,
        error: String,
    },
    /// Traversal and synthesis finished.
    CrawlFinished {
        pages: usize,
        truncated: bool,
        synthesis_unavailable: bool,
    },
    /// The router picked a branch for a turn.
    RouteDecided { route: Route, score: Option<f32> },
    /// A reply is ready for dispatch.
    ReplyReady { kind: ReplyKind, chars: usize },
    /// Error surfaced to the user.
    Error { message: String },
}

/// Sink interface for crawl and router events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn event_payload_uses_tagged_layout() {
        let event = EventMsg::new(
            "chat-1",
            EventPayload::RouteDecided {
                route: Route::Memory,
                score: Some(4.0),
            },
        );
        let encoded = serde_json::to_value(&event).expect("serialize");
        assert_eq!(encoded["conversation_id"], json!("chat-1"));
        assert_eq!(
            encoded["payload"],
            json!({ "type": "route_decided", "payload": { "route": "memory", "score": 4.0 } })
        );
    }

    #[test]
    fn reply_constructors_set_kind() {
        assert_eq!(Reply::answered("hi").kind, ReplyKind::Answered);
        assert_eq!(Reply::crawled("done").kind, ReplyKind::Crawled);
        let encoded = serde_json::to_value(Reply::crawled("done")).expect("serialize");
        assert_eq!(encoded, json!({ "kind": "crawled", "text": "done" }));
    }
}
