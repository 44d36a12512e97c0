//! Configuration schema for trawl.

use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for a trawl agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrawlConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl TrawlConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> TrawlConfigBuilder {
        TrawlConfigBuilder::new()
    }
}

/// Builder for assembling a `TrawlConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct TrawlConfigBuilder {
    config: TrawlConfig,
}

impl TrawlConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: TrawlConfig::default(),
        }
    }

    /// Replace the crawl configuration.
    pub fn crawl(mut self, crawl: CrawlConfig) -> Self {
        self.config.crawl = crawl;
        self
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the router configuration.
    pub fn router(mut self, router: RouterConfig) -> Self {
        self.config.router = router;
        self
    }

    /// Replace the dispatch configuration.
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    /// Finish building the config.
    pub fn build(self) -> TrawlConfig {
        self.config
    }
}

/// Limits and link handling for the crawl orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_seed_timeout_ms")]
    pub seed_timeout_ms: u64,
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,
    /// Ceiling on the combined page text handed to the summarizer.
    #[serde(default = "default_synthesis_max_chars")]
    pub synthesis_max_chars: usize,
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
    #[serde(default = "default_max_links_per_page")]
    pub max_links_per_page: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Reorder each page's links by keyword priority instead of discovery order.
    #[serde(default)]
    pub prioritize_links: bool,
    #[serde(default = "default_priority_keywords")]
    pub priority_keywords: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            seed_timeout_ms: default_seed_timeout_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            synthesis_max_chars: default_synthesis_max_chars(),
            max_page_chars: default_max_page_chars(),
            max_links_per_page: default_max_links_per_page(),
            user_agent: default_user_agent(),
            exclude_patterns: default_exclude_patterns(),
            prioritize_links: false,
            priority_keywords: default_priority_keywords(),
        }
    }
}

/// Default page budget per crawl.
fn default_max_pages() -> usize {
    5
}

/// Default link depth from the seed.
fn default_max_depth() -> usize {
    1
}

/// Default seed fetch timeout in milliseconds.
fn default_seed_timeout_ms() -> u64 {
    30_000
}

/// Default non-seed fetch timeout in milliseconds.
fn default_page_timeout_ms() -> u64 {
    15_000
}

fn default_synthesis_max_chars() -> usize {
    30_000
}

/// Default cap on extracted text per page.
fn default_max_page_chars() -> usize {
    50_000
}

/// Default cap on links kept per page.
fn default_max_links_per_page() -> usize {
    50
}

fn default_user_agent() -> String {
    concat!("trawl/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Default URL substrings that are never crawled.
fn default_exclude_patterns() -> Vec<String> {
    [
        "/logout",
        "/signout",
        "/login",
        "/register",
        "/signin",
        "twitter.com",
        "telegram.org",
        "discord.com",
        "github.com",
    ]
    .iter()
    .map(|pattern| pattern.to_string())
    .collect()
}

/// Default path keywords that raise a link's priority.
fn default_priority_keywords() -> Vec<String> {
    [
        "about",
        "docs",
        "api",
        "features",
        "how-it-works",
        "guide",
        "tutorial",
        "introduction",
        "overview",
        "whitepaper",
        "tokenomics",
        "faq",
        "help",
        "learn",
        "blog",
        "news",
    ]
    .iter()
    .map(|keyword| keyword.to_string())
    .collect()
}

/// Memory store location, pruning and retrieval weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Root directory for conversation logs; defaults to `~/.trawl/memory`.
    #[serde(default)]
    pub path: Option<String>,
    /// Records kept per conversation before non-persistent ones are pruned.
    #[serde(default = "default_max_records")]
    pub max_records: Option<usize>,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_records: default_max_records(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Configured memory root, or `~/.trawl/memory` when unset.
    pub fn root(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(PathBuf::from(path)),
            None => UserDirs::new().map(|dirs| dirs.home_dir().join(".trawl").join("memory")),
        }
    }
}

/// Default per-conversation record cap.
fn default_max_records() -> Option<usize> {
    Some(100)
}

/// Weights for relevance scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Hits must score strictly above this value.
    #[serde(default = "default_floor")]
    pub floor: f32,
    #[serde(default = "default_token_weight")]
    pub token_weight: f32,
    #[serde(default = "default_url_bonus")]
    pub url_bonus: f32,
    #[serde(default = "default_retrieval_limit")]
    pub limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            token_weight: default_token_weight(),
            url_bonus: default_url_bonus(),
            limit: default_retrieval_limit(),
        }
    }
}

/// Default relevance floor.
fn default_floor() -> f32 {
    1.0
}

/// Default multiplier for rarity-weighted token overlap.
fn default_token_weight() -> f32 {
    1.0
}

/// Default bonus for a URL-variant match.
fn default_url_bonus() -> f32 {
    3.0
}

/// Default number of hits returned per retrieval.
fn default_retrieval_limit() -> usize {
    6
}

/// Behaviour when a turn arrives while a crawl is running for the same conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Wait until the in-flight turn finishes.
    #[default]
    Queue,
    /// Fail fast with a busy error.
    Reject,
}

/// Decision router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// A crawl memory hit must score strictly above this to answer without crawling.
    #[serde(default = "default_answer_threshold")]
    pub answer_threshold: f32,
    #[serde(default)]
    pub busy_policy: BusyPolicy,
    /// Store agent replies as non-persistent chat records.
    #[serde(default = "default_remember_replies")]
    pub remember_replies: bool,
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,
    #[serde(default = "default_history_chars")]
    pub history_chars: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            answer_threshold: default_answer_threshold(),
            busy_policy: BusyPolicy::default(),
            remember_replies: default_remember_replies(),
            history_messages: default_history_messages(),
            history_chars: default_history_chars(),
        }
    }
}

/// Default answer-from-memory threshold.
fn default_answer_threshold() -> f32 {
    2.5
}

fn default_remember_replies() -> bool {
    true
}

/// Default number of recent messages passed to the responder.
fn default_history_messages() -> usize {
    10
}

/// Default per-message truncation for history context.
fn default_history_chars() -> usize {
    200
}

/// Outbound segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum characters per outbound segment.
    #[serde(default = "default_segment_limit")]
    pub segment_limit: usize,
    /// Rendering mode sent with each segment; omitted when unset.
    #[serde(default)]
    pub parse_mode: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            segment_limit: default_segment_limit(),
            parse_mode: None,
        }
    }
}

/// Default transport message limit.
fn default_segment_limit() -> usize {
    4096
}
