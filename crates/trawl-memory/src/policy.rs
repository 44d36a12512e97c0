//! Pruning and retrieval tuning for memory stores.

/// Caps the number of records kept per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunePolicy {
    /// `None` keeps everything.
    pub max_records: Option<usize>,
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self {
            max_records: Some(100),
        }
    }
}

impl PrunePolicy {
    /// Keep every record.
    pub fn keep_all() -> Self {
        Self { max_records: None }
    }
}

/// Weights for the two additive relevance signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalWeights {
    /// Hits must score strictly above this value.
    pub floor: f32,
    /// Multiplier for rarity-weighted token overlap.
    pub token_weight: f32,
    /// Added once when any URL variant of the query occurs in the record.
    pub url_bonus: f32,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            floor: 1.0,
            token_weight: 1.0,
            url_bonus: 3.0,
        }
    }
}
