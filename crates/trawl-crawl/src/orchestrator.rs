//! Breadth-first crawl orchestration.

use crate::canonical::canonicalize;
use crate::error::{CrawlError, FetchError};
use crate::fetch::{FetchedPage, PageFetcher};
use crate::links::LinkPolicy;
use crate::result::{CrawlResult, PageRecord};
use crate::summarize::{Summarizer, bound_texts};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use trawl_protocol::{EventMsg, EventPayload, EventSink};
use url::Url;

/// Timeouts and synthesis bounds for a crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Deadline for the seed fetch; exceeding it aborts the crawl.
    pub seed_timeout: Duration,
    /// Deadline for every other page; exceeding it records a failed page.
    pub page_timeout: Duration,
    /// Ceiling on the characters handed to the summarizer.
    pub synthesis_max_chars: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            seed_timeout: Duration::from_secs(30),
            page_timeout: Duration::from_secs(15),
            synthesis_max_chars: 30_000,
        }
    }
}

/// Walks a site from a seed URL within page and depth budgets.
#[derive(Clone)]
pub struct CrawlOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Arc<dyn Summarizer>,
    link_policy: LinkPolicy,
    options: CrawlOptions,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl CrawlOrchestrator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            fetcher,
            summarizer,
            link_policy: LinkPolicy::default(),
            options: CrawlOptions::default(),
            event_sink: None,
        }
    }

    pub fn with_link_policy(mut self, link_policy: LinkPolicy) -> Self {
        self.link_policy = link_policy;
        self
    }

    pub fn with_options(mut self, options: CrawlOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a sink for progress events emitted by `crawl_for`.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Crawl without reporting progress.
    pub async fn crawl(
        &self,
        seed_url: &str,
        max_pages: usize,
        max_depth: usize,
    ) -> Result<CrawlResult, CrawlError> {
        self.run(None, seed_url, max_pages, max_depth).await
    }

    /// Crawl on behalf of a conversation, emitting progress events to the sink.
    pub async fn crawl_for(
        &self,
        conversation_id: &str,
        seed_url: &str,
        max_pages: usize,
        max_depth: usize,
    ) -> Result<CrawlResult, CrawlError> {
        self.run(Some(conversation_id), seed_url, max_pages, max_depth)
            .await
    }

    async fn run(
        &self,
        conversation_id: Option<&str>,
        seed_url: &str,
        max_pages: usize,
        max_depth: usize,
    ) -> Result<CrawlResult, CrawlError> {
        let seed = parse_seed(seed_url)?;
        if max_pages == 0 {
            return Err(CrawlError::InvalidLimits(
                "max_pages must be at least 1".to_string(),
            ));
        }
        info!(
            "crawl started (seed={}, max_pages={}, max_depth={})",
            seed, max_pages, max_depth
        );
        self.emit(
            conversation_id,
            EventPayload::CrawlStarted {
                seed_url: seed.to_string(),
                max_pages,
                max_depth,
            },
        );

        let mut seen: HashSet<String> = HashSet::from([seed.as_str().to_string()]);
        let mut frontier: VecDeque<(Url, usize)> = VecDeque::from([(seed.clone(), 0)]);
        let mut pages: Vec<PageRecord> = Vec::new();
        let mut truncated = false;

        while let Some((url, depth)) = frontier.pop_front() {
            if pages.len() >= max_pages {
                truncated = true;
                break;
            }
            let is_seed = pages.is_empty();
            let fetched = match self.fetch_with_timeout(&url, is_seed).await {
                Ok(fetched) => fetched,
                Err(err) if is_seed => {
                    warn!("seed fetch failed (url={}, error={})", url, err);
                    self.emit(
                        conversation_id,
                        EventPayload::Error {
                            message: format!("seed {url} unreachable: {err}"),
                        },
                    );
                    return Err(CrawlError::SeedUnreachable {
                        url: url.to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    warn!(
                        "page fetch failed (url={}, depth={}, error={})",
                        url, depth, err
                    );
                    self.emit(
                        conversation_id,
                        EventPayload::PageFailed {
                            url: url.to_string(),
                            depth,
                            error: err.to_string(),
                        },
                    );
                    pages.push(PageRecord {
                        url: url.to_string(),
                        title: String::new(),
                        text: String::new(),
                        links: Vec::new(),
                        depth,
                        visited_at: Utc::now(),
                        error: Some(err.to_string()),
                    });
                    continue;
                }
            };

            let links = self.link_policy.select(&seed, &url, &fetched.links);
            pages.push(PageRecord {
                url: url.to_string(),
                title: fetched.title.trim().to_string(),
                text: fetched.text,
                links: links.iter().map(Url::to_string).collect(),
                depth,
                visited_at: Utc::now(),
                error: None,
            });
            self.emit(
                conversation_id,
                EventPayload::PageVisited {
                    url: url.to_string(),
                    depth,
                    title: fetched.title.trim().to_string(),
                    links: links.len(),
                },
            );
            debug!(
                "page visited (url={}, depth={}, links={}, visited={})",
                url,
                depth,
                links.len(),
                pages.len()
            );

            if depth >= max_depth {
                continue;
            }
            for link in links {
                if seen.contains(link.as_str()) {
                    continue;
                }
                if pages.len() >= max_pages {
                    truncated = true;
                    break;
                }
                seen.insert(link.as_str().to_string());
                frontier.push_back((link, depth + 1));
            }
        }

        let (synthesis, synthesis_unavailable) = self.synthesize(&pages).await;
        info!(
            "crawl finished (seed={}, pages={}, truncated={}, synthesis_unavailable={})",
            seed,
            pages.len(),
            truncated,
            synthesis_unavailable
        );
        self.emit(
            conversation_id,
            EventPayload::CrawlFinished {
                pages: pages.len(),
                truncated,
                synthesis_unavailable,
            },
        );

        Ok(CrawlResult {
            seed_url: seed.to_string(),
            pages,
            synthesis,
            synthesis_unavailable,
            truncated,
        })
    }

    async fn fetch_with_timeout(&self, url: &Url, is_seed: bool) -> Result<FetchedPage, FetchError> {
        let limit = if is_seed {
            self.options.seed_timeout
        } else {
            self.options.page_timeout
        };
        match tokio::time::timeout(limit, self.fetcher.fetch(url.as_str())).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(limit.as_millis() as u64)),
        }
    }

    async fn synthesize(&self, pages: &[PageRecord]) -> (String, bool) {
        let texts: Vec<String> = pages
            .iter()
            .filter(|page| !page.failed() && !page.text.trim().is_empty())
            .map(|page| page.text.clone())
            .collect();
        let bounded = bound_texts(&texts, self.options.synthesis_max_chars);
        match self.summarizer.summarize(&bounded).await {
            Ok(synthesis) if !synthesis.trim().is_empty() => (synthesis.trim().to_string(), false),
            Ok(_) => {
                warn!("summarizer returned empty synthesis (pages={})", pages.len());
                (String::new(), true)
            }
            Err(err) => {
                warn!("synthesis unavailable (pages={}, error={})", pages.len(), err);
                (String::new(), true)
            }
        }
    }

    fn emit(&self, conversation_id: Option<&str>, payload: EventPayload) {
        if let (Some(conversation_id), Some(sink)) = (conversation_id, &self.event_sink) {
            sink.emit(EventMsg::new(conversation_id, payload));
        }
    }
}

fn parse_seed(raw: &str) -> Result<Url, CrawlError> {
    let invalid = |reason: &str| CrawlError::InvalidSeed {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(canonicalize(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizeError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct MapFetcher {
        pages: HashMap<String, FetchedPage>,
    }

    impl MapFetcher {
        fn new(pages: &[(&str, &str, &[&str])]) -> Self {
            let pages = pages
                .iter()
                .map(|(url, title, links)| {
                    (
                        url.to_string(),
                        FetchedPage {
                            text: format!("{title} body."),
                            title: title.to_string(),
                            links: links.iter().map(|link| link.to_string()).collect(),
                        },
                    )
                })
                .collect();
            Self { pages }
        }
    }

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.pages.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }

    struct EchoSummarizer;

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        async fn summarize(&self, texts: &[String]) -> Result<String, SummarizeError> {
            Ok(texts.join(" "))
        }
    }

    fn orchestrator(fetcher: MapFetcher) -> CrawlOrchestrator {
        CrawlOrchestrator::new(Arc::new(fetcher), Arc::new(EchoSummarizer))
    }

    fn urls(result: &CrawlResult) -> Vec<&str> {
        result.pages.iter().map(|page| page.url.as_str()).collect()
    }

    #[tokio::test]
    async fn rejects_bad_seed_and_limits() {
        let crawler = orchestrator(MapFetcher::new(&[]));
        let err = crawler.crawl("ftp://site.test", 3, 1).await.expect_err("scheme");
        assert!(matches!(err, CrawlError::InvalidSeed { .. }));
        let err = crawler.crawl("not a url", 3, 1).await.expect_err("parse");
        assert!(matches!(err, CrawlError::InvalidSeed { .. }));
        let err = crawler
            .crawl("https://site.test", 0, 1)
            .await
            .expect_err("limits");
        assert!(matches!(err, CrawlError::InvalidLimits(_)));
    }

    #[tokio::test]
    async fn depth_zero_visits_only_seed() {
        let crawler = orchestrator(MapFetcher::new(&[(
            "https://site.test/",
            "Home",
            &["/a", "/b"],
        )]));
        let result = crawler.crawl("https://site.test", 5, 0).await.expect("crawl");
        assert_eq!(urls(&result), vec!["https://site.test/"]);
        assert!(!result.truncated);
        assert_eq!(
            result.pages[0].links,
            vec!["https://site.test/a", "https://site.test/b"]
        );
    }

    #[tokio::test]
    async fn breadth_first_with_page_budget() {
        let crawler = orchestrator(MapFetcher::new(&[
            ("https://site.test/", "Home", &["/a", "/b", "/c"]),
            ("https://site.test/a", "A", &["/a/deep"]),
            ("https://site.test/b", "B", &[]),
            ("https://site.test/c", "C", &[]),
        ]));
        let result = crawler.crawl("https://site.test/", 3, 2).await.expect("crawl");
        assert_eq!(
            urls(&result),
            vec![
                "https://site.test/",
                "https://site.test/a",
                "https://site.test/b"
            ]
        );
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn link_cycles_do_not_revisit() {
        let crawler = orchestrator(MapFetcher::new(&[
            ("https://site.test/", "Home", &["/a", "/#top"]),
            ("https://site.test/a", "A", &["/", "/a/"]),
        ]));
        let result = crawler.crawl("https://site.test/", 10, 5).await.expect("crawl");
        assert_eq!(urls(&result), vec!["https://site.test/", "https://site.test/a"]);
        assert!(!result.truncated);
        assert_eq!(result.synthesis, "Home body. A body.");
    }
}
