use async_trait::async_trait;
use std::io;
use trawl_memory::{
    MemoryError, MemoryRecord, MemoryStore, NewMemoryRecord, RetrievalHit, RetrievalQuery,
};

/// Store whose disk is gone: appends and scans fail, retrieval finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingMemoryStore;

fn unavailable() -> MemoryError {
    MemoryError::Io(io::Error::other("disk unavailable"))
}

#[async_trait]
impl MemoryStore for FailingMemoryStore {
    async fn append(&self, _record: NewMemoryRecord) -> Result<u64, MemoryError> {
        Err(unavailable())
    }

    async fn retrieve(
        &self,
        _query: &RetrievalQuery,
        _conversation_id: &str,
        _limit: usize,
    ) -> Vec<RetrievalHit> {
        Vec::new()
    }

    async fn scan(&self, _conversation_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        Err(unavailable())
    }
}
