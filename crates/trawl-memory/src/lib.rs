//! Conversation memory for trawl: an append-only log per conversation with
//! relevance retrieval that tolerates lexical variation in URLs.

pub mod error;
pub mod model;
pub mod policy;
pub mod retrieval;
pub mod store;
pub mod variants;

/// Memory error type.
pub use error::MemoryError;
/// Memory record model.
pub use model::{Author, MemoryRecord, NewMemoryRecord, RecordKind};
/// Prune policy and retrieval weights.
pub use policy::{PrunePolicy, RetrievalWeights};
/// Scored retrieval.
pub use retrieval::{RetrievalHit, score_records, tokenize};
/// Memory store interface and default file implementation.
pub use store::{FileMemoryStore, MemoryStore};
/// Query construction and URL variant derivation.
pub use variants::{RetrievalQuery, SuffixTable, derive_variants};
