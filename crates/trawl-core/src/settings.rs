//! Conversions from config sections to the runtime types of each crate.

use std::time::Duration;
use trawl_config::{BusyPolicy, CrawlConfig, MemoryConfig, RetrievalConfig, TrawlConfig};
use trawl_crawl::{CrawlOptions, LinkPolicy};
use trawl_memory::{PrunePolicy, RetrievalWeights};

/// Knobs the decision router reads on every turn.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// A crawl-kind hit must score strictly above this to answer from memory.
    pub answer_threshold: f32,
    pub busy_policy: BusyPolicy,
    pub remember_replies: bool,
    pub history_messages: usize,
    pub history_chars: usize,
    pub retrieval_limit: usize,
    pub max_pages: usize,
    pub max_depth: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from_config(&TrawlConfig::default())
    }
}

impl RouterSettings {
    pub fn from_config(config: &TrawlConfig) -> Self {
        Self {
            answer_threshold: config.router.answer_threshold,
            busy_policy: config.router.busy_policy,
            remember_replies: config.router.remember_replies,
            history_messages: config.router.history_messages,
            history_chars: config.router.history_chars,
            retrieval_limit: config.memory.retrieval.limit,
            max_pages: config.crawl.max_pages,
            max_depth: config.crawl.max_depth,
        }
    }
}

pub fn crawl_options(config: &CrawlConfig) -> CrawlOptions {
    CrawlOptions {
        seed_timeout: Duration::from_millis(config.seed_timeout_ms),
        page_timeout: Duration::from_millis(config.page_timeout_ms),
        synthesis_max_chars: config.synthesis_max_chars,
    }
}

pub fn link_policy(config: &CrawlConfig) -> LinkPolicy {
    LinkPolicy {
        exclude_patterns: config.exclude_patterns.clone(),
        prioritize: config.prioritize_links,
        priority_keywords: config.priority_keywords.clone(),
    }
}

pub fn retrieval_weights(config: &RetrievalConfig) -> RetrievalWeights {
    RetrievalWeights {
        floor: config.floor,
        token_weight: config.token_weight,
        url_bonus: config.url_bonus,
    }
}

pub fn prune_policy(config: &MemoryConfig) -> PrunePolicy {
    PrunePolicy {
        max_records: config.max_records,
    }
}
