//! Routing and reply delivery for trawl.
//!
//! This crate owns the decision router that chooses between answering from
//! memory and launching a crawl, the per-conversation gate that serializes
//! turns, and the dispatcher that chunks replies for the chat transport.

pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod responder;
pub mod router;
pub mod settings;

pub use dispatcher::{
    DEFAULT_SEGMENT_LIMIT, OutboundSegment, ReplyTransport, ResponseDispatcher, split_segments,
};
pub use error::{ResponderError, RouterError, TransportError};
pub use gate::{ConversationGate, ConversationState, TurnGuard};
pub use responder::{Responder, ResponseRequest, TemplateResponder};
pub use router::{DecisionRouter, extract_url};
pub use settings::{RouterSettings, crawl_options, link_policy, prune_policy, retrieval_weights};
/// Event sink used by the router and orchestrator.
pub use trawl_protocol::EventSink;
