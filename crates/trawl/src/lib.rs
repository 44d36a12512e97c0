//! Public SDK surface for trawl.
//!
//! This crate re-exports the building blocks and wires them together from a
//! `TrawlConfig`, so binaries and embedders assemble the agent the same way.

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Re-export for convenience.
pub use trawl_config as config;
/// Re-export for convenience.
pub use trawl_core as core;
/// Re-export for convenience.
pub use trawl_crawl as crawl;
/// Re-export for convenience.
pub use trawl_memory as memory;
/// Re-export for convenience.
pub use trawl_protocol as protocol;

use trawl_config::TrawlConfig;
use trawl_core::{
    DecisionRouter, ReplyTransport, ResponseDispatcher, RouterSettings, crawl_options, link_policy,
    prune_policy, retrieval_weights,
};
use trawl_crawl::{CrawlOrchestrator, ExtractiveSummarizer, FetchError, HttpPageFetcher};
use trawl_memory::{FileMemoryStore, MemoryError};
use trawl_protocol::{EventMsg, EventPayload, EventSink};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}

/// Event sink that writes progress to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: EventMsg) {
        match &event.payload {
            EventPayload::Error { message } => warn!(
                "conversation error (conversation_id={}, message={})",
                event.conversation_id, message
            ),
            payload => info!(
                "event (conversation_id={}, payload={})",
                event.conversation_id,
                serde_json::to_string(payload).unwrap_or_default()
            ),
        }
    }
}

/// File-backed memory store with the configured prune policy and weights.
pub fn memory_store(config: &TrawlConfig, root: &Path) -> Result<FileMemoryStore, MemoryError> {
    Ok(FileMemoryStore::new(root)?
        .with_prune_policy(prune_policy(&config.memory))
        .with_weights(retrieval_weights(&config.memory.retrieval)))
}

/// HTTP crawler with the extractive summarizer.
pub fn crawl_orchestrator(config: &TrawlConfig) -> Result<CrawlOrchestrator, FetchError> {
    let fetcher = HttpPageFetcher::new(
        Duration::from_millis(config.crawl.page_timeout_ms.max(config.crawl.seed_timeout_ms)),
        &config.crawl.user_agent,
    )?
    .with_limits(config.crawl.max_page_chars, config.crawl.max_links_per_page);
    Ok(
        CrawlOrchestrator::new(Arc::new(fetcher), Arc::new(ExtractiveSummarizer::default()))
            .with_link_policy(link_policy(&config.crawl))
            .with_options(crawl_options(&config.crawl)),
    )
}

/// Router over the given store and crawler, configured from `config`.
pub fn decision_router(
    config: &TrawlConfig,
    store: Arc<FileMemoryStore>,
    crawler: CrawlOrchestrator,
    event_sink: Arc<dyn EventSink>,
) -> DecisionRouter {
    DecisionRouter::new(store, crawler.with_event_sink(event_sink.clone()))
        .with_settings(RouterSettings::from_config(config))
        .with_event_sink(event_sink)
}

/// Dispatcher over a transport with the configured segment limit and parse mode.
pub fn response_dispatcher(
    config: &TrawlConfig,
    transport: Arc<dyn ReplyTransport>,
) -> ResponseDispatcher {
    ResponseDispatcher::new(transport)
        .with_segment_limit(config.dispatch.segment_limit)
        .with_parse_mode(config.dispatch.parse_mode.clone())
}
