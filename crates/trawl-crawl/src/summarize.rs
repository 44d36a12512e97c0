//! Synthesis of crawled page texts.

use crate::error::SummarizeError;
use async_trait::async_trait;

/// Turns a bounded list of page texts into one synthesis.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, texts: &[String]) -> Result<String, SummarizeError>;
}

/// Deterministic summarizer that keeps each page's leading sentences.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    sentences_per_page: usize,
    max_chars: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self {
            sentences_per_page: 3,
            max_chars: 2_000,
        }
    }
}

impl ExtractiveSummarizer {
    pub fn new(sentences_per_page: usize, max_chars: usize) -> Self {
        Self {
            sentences_per_page: sentences_per_page.max(1),
            max_chars,
        }
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, texts: &[String]) -> Result<String, SummarizeError> {
        if texts.iter().all(|text| text.trim().is_empty()) {
            return Err(SummarizeError::EmptyInput);
        }
        let mut parts = Vec::new();
        let mut used = 0usize;
        for text in texts {
            let lead = leading_sentences(text, self.sentences_per_page);
            if lead.is_empty() {
                continue;
            }
            let len = lead.chars().count();
            if used + len > self.max_chars {
                let remaining = self.max_chars.saturating_sub(used);
                if remaining > 0 {
                    parts.push(lead.chars().take(remaining).collect::<String>());
                }
                break;
            }
            used += len + 1;
            parts.push(lead);
        }
        Ok(parts.join("\n"))
    }
}

/// First `count` sentences of a text, whitespace collapsed.
fn leading_sentences(text: &str, count: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut end = collapsed.len();
    let mut found = 0;
    let mut chars = collapsed.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?')
            && chars.peek().is_none_or(|(_, next)| next.is_whitespace())
        {
            found += 1;
            if found == count {
                end = index + ch.len_utf8();
                break;
            }
        }
    }
    collapsed[..end].to_string()
}

/// Bound the total size of synthesis input to `ceiling` characters.
///
/// Oldest texts are dropped first; if the newest alone still exceeds the
/// ceiling it is truncated on a char boundary.
pub fn bound_texts(texts: &[String], ceiling: usize) -> Vec<String> {
    let mut start = 0;
    let mut total: usize = texts.iter().map(|text| text.chars().count()).sum();
    while total > ceiling && start + 1 < texts.len() {
        total -= texts[start].chars().count();
        start += 1;
    }
    let mut kept: Vec<String> = texts[start..].to_vec();
    if total > ceiling
        && let Some(last) = kept.last_mut()
    {
        *last = last.chars().take(ceiling).collect();
    }
    kept
}
