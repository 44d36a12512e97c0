//! Splits replies into transport-sized segments and delivers them in order.

use crate::error::TransportError;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trawl_protocol::ConversationId;

/// Telegram's message length limit.
pub const DEFAULT_SEGMENT_LIMIT: usize = 4096;

/// One message handed to the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundSegment {
    pub conversation_id: ConversationId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

/// Delivery side of the chat transport.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    async fn send(&self, segment: OutboundSegment) -> Result<(), TransportError>;
}

/// Sends replies through a transport, segment by segment.
#[derive(Clone)]
pub struct ResponseDispatcher {
    transport: Arc<dyn ReplyTransport>,
    segment_limit: usize,
    parse_mode: Option<String>,
}

impl ResponseDispatcher {
    pub fn new(transport: Arc<dyn ReplyTransport>) -> Self {
        Self {
            transport,
            segment_limit: DEFAULT_SEGMENT_LIMIT,
            parse_mode: None,
        }
    }

    pub fn with_segment_limit(mut self, segment_limit: usize) -> Self {
        self.segment_limit = segment_limit.max(1);
        self
    }

    pub fn with_parse_mode(mut self, parse_mode: Option<String>) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    /// Deliver `text` and return the number of segments sent.
    ///
    /// Stops at the first transport error; segments already sent stay sent.
    pub async fn dispatch(&self, conversation_id: &str, text: &str) -> Result<usize, TransportError> {
        let segments = split_segments(text, self.segment_limit);
        let count = segments.len();
        for (index, text) in segments.into_iter().enumerate() {
            debug!(
                "sending segment (conversation_id={}, index={}, chars={})",
                conversation_id,
                index,
                text.chars().count()
            );
            self.transport
                .send(OutboundSegment {
                    conversation_id: conversation_id.to_string(),
                    text,
                    parse_mode: self.parse_mode.clone(),
                })
                .await?;
        }
        Ok(count)
    }
}

/// Split text into segments of at most `limit` chars.
///
/// A cut prefers the last newline inside the window and drops that newline;
/// otherwise it falls on the char boundary at the limit. Blank segments are
/// skipped, so whitespace-only text yields nothing.
pub fn split_segments(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut segments = Vec::new();
    let mut rest = text;
    while !rest.trim().is_empty() {
        let window_end = match rest.char_indices().nth(limit) {
            Some((index, _)) => index,
            None => {
                segments.push(rest.to_string());
                break;
            }
        };
        let window = &rest[..window_end];
        let (segment, next) = match window.rfind('\n') {
            Some(newline) if newline > 0 => (&rest[..newline], &rest[newline + 1..]),
            _ => (window, &rest[window_end..]),
        };
        if !segment.trim().is_empty() {
            segments.push(segment.to_string());
        }
        rest = next;
    }
    segments
}
