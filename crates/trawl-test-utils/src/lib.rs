//! Test helpers shared across trawl crates.

pub mod events;
pub mod fetch;
pub mod memory;
pub mod responder;
pub mod summarize;
pub mod transport;

pub use events::CollectingEventSink;
pub use fetch::{FetchPause, ScriptedFetcher};
pub use memory::FailingMemoryStore;
pub use responder::{FailingResponder, RecordingResponder};
pub use summarize::{FailingSummarizer, FixedSummarizer};
pub use transport::RecordingTransport;
