//! Relevance scoring over a conversation's records.
//!
//! Two additive signals: rarity-weighted token overlap, and a fixed bonus
//! when any URL variant of the query occurs in the record. Rarity depends
//! only on how many records contain a token, so appending a record that
//! shares no token with a query leaves every existing score for that query
//! unchanged.

use crate::model::MemoryRecord;
use crate::policy::RetrievalWeights;
use crate::variants::RetrievalQuery;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Words that carry no retrieval signal.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "but", "by", "can", "could", "did",
    "do", "does", "find", "for", "found", "from", "had", "has", "have", "how", "http", "https",
    "i", "if", "in", "into", "is", "it", "its", "me", "my", "no", "not", "of", "on", "or",
    "our", "please", "so", "tell", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "to", "us", "was", "we", "were", "what", "when", "where", "which",
    "who", "why", "will", "with", "would", "www", "you", "your",
];

/// A record with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub record: MemoryRecord,
    pub score: f32,
}

/// Lower-case, punctuation-split, stopword-free tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2 && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Score every record against the query and keep those above the floor.
///
/// Hits are ordered by score descending, ties by id (recency) descending.
pub fn score_records(
    query: &RetrievalQuery,
    records: &[MemoryRecord],
    weights: &RetrievalWeights,
    limit: usize,
) -> Vec<RetrievalHit> {
    let query_tokens: HashSet<String> = tokenize(&query.raw_text).into_iter().collect();
    if (query_tokens.is_empty() && query.derived_url_variants.is_empty()) || limit == 0 {
        return Vec::new();
    }

    let record_tokens: Vec<HashSet<String>> = records
        .iter()
        .map(|record| {
            tokenize(&record.content)
                .into_iter()
                .filter(|token| query_tokens.contains(token))
                .collect()
        })
        .collect();

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in &record_tokens {
        for token in tokens {
            *document_frequency.entry(token.as_str()).or_default() += 1;
        }
    }

    let mut hits = Vec::new();
    for (record, tokens) in records.iter().zip(&record_tokens) {
        let overlap: f32 = tokens
            .iter()
            .map(|token| {
                let df = document_frequency.get(token.as_str()).copied().unwrap_or(1);
                rarity(df)
            })
            .sum();
        let mut score = overlap * weights.token_weight;
        if !query.derived_url_variants.is_empty() {
            let content = record.content.to_lowercase();
            if query
                .derived_url_variants
                .iter()
                .any(|variant| content.contains(variant.as_str()))
            {
                score += weights.url_bonus;
            }
        }
        if score > weights.floor {
            hits.push(RetrievalHit {
                record: record.clone(),
                score,
            });
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.id.cmp(&a.record.id))
    });
    hits.truncate(limit);
    hits
}

/// Weight of a token found in `df` records.
fn rarity(df: usize) -> f32 {
    1.0 / (1.0 + (df.max(1) as f32).ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, RecordKind};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(id: u64, content: &str) -> MemoryRecord {
        MemoryRecord {
            id,
            conversation_id: "chat".to_string(),
            author: Author::User,
            kind: RecordKind::Chat,
            content: content.to_string(),
            created_at: Utc::now(),
            persistent: false,
        }
    }

    #[test]
    fn tokenize_strips_punctuation_and_stopwords() {
        assert_eq!(
            tokenize("What did you find at Example.org?"),
            vec!["example".to_string(), "org".to_string()]
        );
    }

    #[test]
    fn rare_tokens_outweigh_common_ones() {
        let records = vec![
            record(1, "rust memory store"),
            record(2, "rust crawler"),
            record(3, "rust tokio"),
        ];
        let query = RetrievalQuery::from_text("rust memory store");
        let weights = RetrievalWeights {
            floor: 0.0,
            ..RetrievalWeights::default()
        };
        let hits = score_records(&query, &records, &weights, 10);
        assert_eq!(hits[0].record.id, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn ties_break_by_recency() {
        let records = vec![record(1, "alpha beta"), record(2, "alpha beta")];
        let query = RetrievalQuery::from_text("alpha beta");
        let weights = RetrievalWeights {
            floor: 0.0,
            ..RetrievalWeights::default()
        };
        let hits = score_records(&query, &records, &weights, 10);
        let ids: Vec<u64> = hits.iter().map(|hit| hit.record.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn url_bonus_applies_once() {
        let records = vec![record(1, "visited https://example.org and example.org/docs")];
        let query = RetrievalQuery::from_text("example.org");
        let weights = RetrievalWeights::default();
        let hits = score_records(&query, &records, &weights, 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score < weights.url_bonus + 2.0 * weights.token_weight + 0.001);
        assert!(hits[0].score >= weights.url_bonus);
    }

    #[test]
    fn limit_truncates_results() {
        let records: Vec<_> = (1..=5).map(|id| record(id, "tokio runtime")).collect();
        let query = RetrievalQuery::from_text("tokio runtime");
        let weights = RetrievalWeights {
            floor: 0.0,
            ..RetrievalWeights::default()
        };
        assert_eq!(score_records(&query, &records, &weights, 2).len(), 2);
        assert!(score_records(&query, &records, &weights, 0).is_empty());
    }
}
