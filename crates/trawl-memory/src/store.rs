//! Memory store interface and the JSONL file implementation.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, NewMemoryRecord};
use crate::policy::{PrunePolicy, RetrievalWeights};
use crate::retrieval::{RetrievalHit, score_records};
use crate::variants::{RetrievalQuery, SuffixTable};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[async_trait]
/// Append-only conversation memory with scored retrieval.
pub trait MemoryStore: Send + Sync {
    /// Durably append a record and return its assigned id.
    async fn append(&self, record: NewMemoryRecord) -> Result<u64, MemoryError>;

    /// Scored retrieval; never fails, returns no hits when nothing clears the floor.
    async fn retrieve(
        &self,
        query: &RetrievalQuery,
        conversation_id: &str,
        limit: usize,
    ) -> Vec<RetrievalHit>;

    /// All records of a conversation in creation order.
    async fn scan(&self, conversation_id: &str) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// The last `limit` records in creation order.
    async fn recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.scan(conversation_id).await?;
        let start = records.len().saturating_sub(limit);
        Ok(records[start..].to_vec())
    }

    /// Apply the prune policy now; returns the number of removed records.
    async fn prune(&self, _conversation_id: &str) -> Result<usize, MemoryError> {
        Ok(0)
    }
}

/// Per-conversation write state guarded by the conversation lock.
#[derive(Debug, Default)]
struct ConversationLog {
    /// Next id to assign; loaded lazily from the log tail.
    next_id: Option<u64>,
}

/// File-backed store writing one JSONL log per conversation.
#[derive(Debug, Clone)]
pub struct FileMemoryStore {
    root: PathBuf,
    prune: PrunePolicy,
    weights: RetrievalWeights,
    logs: Arc<Mutex<HashMap<String, Arc<Mutex<ConversationLog>>>>>,
}

impl FileMemoryStore {
    /// Create a store under the given root with default policies.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file memory store (root={})", root.display());
        Ok(Self {
            root,
            prune: PrunePolicy::default(),
            weights: RetrievalWeights::default(),
            logs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn with_prune_policy(mut self, prune: PrunePolicy) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_weights(mut self, weights: RetrievalWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lock handle for one conversation.
    fn log_lock(&self, conversation_id: &str) -> Arc<Mutex<ConversationLog>> {
        let mut logs = self.logs.lock();
        logs.entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// Path to the conversation JSONL file.
    fn conversation_path(&self, conversation_id: &str) -> Result<PathBuf, MemoryError> {
        Ok(self
            .root
            .join(format!("{}.jsonl", file_stem(conversation_id)?)))
    }

    /// Path to the temporary conversation file used for rewrites.
    fn temp_path(&self, conversation_id: &str) -> Result<PathBuf, MemoryError> {
        Ok(self
            .root
            .join(format!("{}.jsonl.tmp", file_stem(conversation_id)?)))
    }

    /// Load all records for a conversation. Caller holds the conversation lock.
    fn load_records(&self, conversation_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let path = self.conversation_path(conversation_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: MemoryRecord = serde_json::from_str(&line)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite a conversation's records atomically. Caller holds the conversation lock.
    fn write_records(
        &self,
        conversation_id: &str,
        records: &[MemoryRecord],
    ) -> Result<(), MemoryError> {
        let path = self.conversation_path(conversation_id)?;
        let temp_path = self.temp_path(conversation_id)?;
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            for record in records {
                let line = serde_json::to_string(record)?;
                writeln!(file, "{line}")?;
            }
            file.sync_data()?;
        }
        std::fs::rename(temp_path, path)?;
        Ok(())
    }

    /// Drop the oldest non-persistent records beyond the cap, never the newest record.
    fn prune_locked(&self, conversation_id: &str) -> Result<usize, MemoryError> {
        let Some(max_records) = self.prune.max_records else {
            return Ok(0);
        };
        let mut records = self.load_records(conversation_id)?;
        if records.len() <= max_records {
            return Ok(0);
        }
        let mut excess = records.len() - max_records;
        let newest = records.last().map(|record| record.id);
        let before = records.len();
        records.retain(|record| {
            if excess == 0 || record.persistent || Some(record.id) == newest {
                return true;
            }
            excess -= 1;
            false
        });
        let removed = before - records.len();
        if removed > 0 {
            self.write_records(conversation_id, &records)?;
            info!(
                "memory pruned (conversation_id={}, removed={}, remaining={})",
                conversation_id,
                removed,
                records.len()
            );
        }
        Ok(removed)
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    /// Append under the conversation lock and sync before returning.
    async fn append(&self, record: NewMemoryRecord) -> Result<u64, MemoryError> {
        let conversation_id = record.conversation_id.clone();
        let path = self.conversation_path(&conversation_id)?;
        let lock = self.log_lock(&conversation_id);
        let mut state = lock.lock();

        let id = match state.next_id {
            Some(id) => id,
            None => self
                .load_records(&conversation_id)?
                .last()
                .map_or(1, |record| record.id + 1),
        };
        let record = record.into_record(id, Utc::now());
        let line = serde_json::to_string(&record)?;
        {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{line}")?;
            file.sync_data()?;
        }
        state.next_id = Some(id + 1);
        debug!(
            "appended memory record (conversation_id={}, id={}, author={}, kind={}, content_len={})",
            conversation_id,
            id,
            record.author,
            record.kind,
            record.content.len()
        );

        if let Err(err) = self.prune_locked(&conversation_id) {
            warn!(
                "memory prune failed (conversation_id={}, error={})",
                conversation_id, err
            );
        }
        Ok(id)
    }

    async fn retrieve(
        &self,
        query: &RetrievalQuery,
        conversation_id: &str,
        limit: usize,
    ) -> Vec<RetrievalHit> {
        let lock = self.log_lock(conversation_id);
        let records = {
            let _state = lock.lock();
            match self.load_records(conversation_id) {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        "memory retrieve degraded to empty (conversation_id={}, error={})",
                        conversation_id, err
                    );
                    return Vec::new();
                }
            }
        };
        let query = query.clone().with_suffixes(&SuffixTable::from_records(&records));
        let hits = score_records(&query, &records, &self.weights, limit);
        debug!(
            "retrieve memory (conversation_id={}, candidates={}, variants={}, returned={})",
            conversation_id,
            records.len(),
            query.derived_url_variants.len(),
            hits.len()
        );
        hits
    }

    async fn scan(&self, conversation_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let lock = self.log_lock(conversation_id);
        let _state = lock.lock();
        self.load_records(conversation_id)
    }

    async fn prune(&self, conversation_id: &str) -> Result<usize, MemoryError> {
        let lock = self.log_lock(conversation_id);
        let _state = lock.lock();
        self.prune_locked(conversation_id)
    }
}

/// Map a conversation id to a safe file stem.
fn file_stem(conversation_id: &str) -> Result<String, MemoryError> {
    let trimmed = conversation_id.trim();
    if trimmed.is_empty() {
        return Err(MemoryError::InvalidConversation(conversation_id.to_string()));
    }
    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{FileMemoryStore, MemoryStore, file_stem};
    use crate::{MemoryError, NewMemoryRecord, PrunePolicy, RecordKind, RetrievalQuery};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn file_stem_sanitizes_ids() {
        assert_eq!(file_stem("-100123").expect("stem"), "-100123");
        assert_eq!(file_stem("../etc/passwd").expect("stem"), "___etc_passwd");
        assert!(matches!(
            file_stem("  "),
            Err(MemoryError::InvalidConversation(_))
        ));
    }

    #[tokio::test]
    async fn append_assigns_monotonic_ids_in_order() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");

        let a = store
            .append(NewMemoryRecord::user("chat", "one"))
            .await
            .expect("append a");
        let b = store
            .append(NewMemoryRecord::agent("chat", "two"))
            .await
            .expect("append b");
        let c = store
            .append(NewMemoryRecord::user("chat", "three"))
            .await
            .expect("append c");
        assert_eq!((a, b, c), (1, 2, 3));

        let records = store.scan("chat").await.expect("scan");
        let contents: Vec<_> = records.iter().map(|record| record.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn ids_continue_after_reopen() {
        let temp = tempdir().expect("tempdir");
        {
            let store = FileMemoryStore::new(temp.path()).expect("store");
            store
                .append(NewMemoryRecord::user("chat", "first"))
                .await
                .expect("append");
        }
        let store = FileMemoryStore::new(temp.path()).expect("reopen");
        let id = store
            .append(NewMemoryRecord::user("chat", "second"))
            .await
            .expect("append");
        assert_eq!(id, 2);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path()).expect("store");
        store
            .append(NewMemoryRecord::user("a", "crawl https://example.org"))
            .await
            .expect("append a");
        store
            .append(NewMemoryRecord::user("b", "hello"))
            .await
            .expect("append b");

        let query = RetrievalQuery::from_text("example.org");
        assert!(store.retrieve(&query, "b", 5).await.is_empty());
        assert_eq!(store.retrieve(&query, "a", 5).await.len(), 1);
    }

    #[tokio::test]
    async fn prune_keeps_persistent_and_newest_records() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path())
            .expect("store")
            .with_prune_policy(PrunePolicy {
                max_records: Some(3),
            });

        store
            .append(NewMemoryRecord::crawl("chat", "crawl of https://site.test/"))
            .await
            .expect("crawl");
        for index in 0..4 {
            store
                .append(NewMemoryRecord::user("chat", format!("turn {index}")))
                .await
                .expect("turn");
        }

        let records = store.scan("chat").await.expect("scan");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, RecordKind::Crawl);
        let ids: Vec<u64> = records.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![1, 4, 5]);
    }

    #[tokio::test]
    async fn recent_returns_tail_in_order() {
        let temp = tempdir().expect("tempdir");
        let store = FileMemoryStore::new(temp.path())
            .expect("store")
            .with_prune_policy(PrunePolicy::keep_all());
        for index in 0..5 {
            store
                .append(NewMemoryRecord::user("chat", format!("m{index}")))
                .await
                .expect("append");
        }
        let recent = store.recent("chat", 2).await.expect("recent");
        let contents: Vec<_> = recent.iter().map(|record| record.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }
}
