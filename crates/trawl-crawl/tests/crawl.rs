//! Crawl orchestrator integration tests against scripted sites.

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use trawl_crawl::{CrawlError, CrawlOptions, CrawlOrchestrator, FetchError, LinkPolicy};
use trawl_protocol::EventPayload;
use trawl_test_utils::{CollectingEventSink, FailingSummarizer, FixedSummarizer, ScriptedFetcher};

fn site() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .with_page(
            "https://site.test/",
            "Site Home",
            "Site sells widgets. Ships worldwide.",
            &["/about", "/pricing", "https://other.test/"],
        )
        .with_page(
            "https://site.test/about",
            "About Us",
            "Founded in 2020.",
            &["/", "/pricing", "/team"],
        )
        .with_page(
            "https://site.test/pricing",
            "Pricing",
            "Widgets cost ten credits.",
            &["/about"],
        )
}

fn orchestrator(fetcher: ScriptedFetcher, summarizer: FixedSummarizer) -> CrawlOrchestrator {
    CrawlOrchestrator::new(Arc::new(fetcher), Arc::new(summarizer))
}

/// Three linked pages within budget are all visited and summarized.
#[tokio::test]
async fn crawls_small_site_end_to_end() {
    let summarizer = FixedSummarizer::new("A widget shop with simple pricing.");
    let crawler = orchestrator(site(), summarizer.clone());

    let result = crawler
        .crawl("https://site.test", 3, 1)
        .await
        .expect("crawl");

    assert!(!result.truncated);
    assert!(!result.synthesis_unavailable);
    assert_eq!(result.synthesis, "A widget shop with simple pricing.");
    let urls: Vec<&str> = result.pages.iter().map(|page| page.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/",
            "https://site.test/about",
            "https://site.test/pricing"
        ]
    );
    let rendered = result.render();
    assert!(rendered.contains("https://site.test/"));
    for title in ["Site Home", "About Us", "Pricing"] {
        assert!(rendered.contains(title), "missing {title}");
    }
    assert_eq!(summarizer.inputs().len(), 1);
    assert_eq!(summarizer.inputs()[0].len(), 3);
}

/// Visited pages are unique and never exceed the page budget.
#[tokio::test]
async fn page_budget_and_uniqueness_hold() {
    let mut fetcher = ScriptedFetcher::new().with_page(
        "https://site.test/",
        "Home",
        "Home page.",
        &["/a", "/b", "/c", "/d", "/e", "/a#frag", "/b/"],
    );
    for name in ["a", "b", "c", "d", "e"] {
        fetcher = fetcher.with_page(
            &format!("https://site.test/{name}"),
            name,
            "Leaf page.",
            &["/", "/a", "/e"],
        );
    }
    let crawler = orchestrator(fetcher.clone(), FixedSummarizer::new("summary"));

    let result = crawler
        .crawl("https://site.test/", 4, 3)
        .await
        .expect("crawl");

    assert_eq!(result.pages.len(), 4);
    let unique: HashSet<&str> = result.pages.iter().map(|page| page.url.as_str()).collect();
    assert_eq!(unique.len(), result.pages.len());
    assert!(result.truncated);
    assert_eq!(fetcher.calls().len(), 4);
}

/// A seed that cannot be fetched fails the whole crawl.
#[tokio::test]
async fn seed_failure_is_fatal() {
    let fetcher =
        ScriptedFetcher::new().with_failure("https://down.test/", FetchError::Status(503));
    let sink = Arc::new(CollectingEventSink::new());
    let crawler =
        orchestrator(fetcher, FixedSummarizer::new("unused")).with_event_sink(sink.clone());

    let err = crawler
        .crawl_for("chat", "https://down.test/", 3, 1)
        .await
        .expect_err("seed failure");
    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 2);
    assert!(matches!(payloads[0], EventPayload::CrawlStarted { .. }));
    assert!(matches!(
        &payloads[1],
        EventPayload::Error { message } if message.contains("https://down.test/")
    ));
    match err {
        CrawlError::SeedUnreachable { url, reason } => {
            assert_eq!(url, "https://down.test/");
            assert!(reason.contains("503"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Non-seed failures are recorded as pages with an error note.
#[tokio::test]
async fn page_failure_is_recorded() {
    let fetcher = site().with_failure(
        "https://site.test/about",
        FetchError::Request("connection reset".to_string()),
    );
    let sink = Arc::new(CollectingEventSink::new());
    let crawler =
        orchestrator(fetcher, FixedSummarizer::new("summary")).with_event_sink(sink.clone());

    let result = crawler
        .crawl_for("chat", "https://site.test/", 5, 1)
        .await
        .expect("crawl");

    assert_eq!(result.pages.len(), 3);
    let about = &result.pages[1];
    assert_eq!(about.url, "https://site.test/about");
    assert!(about.failed());
    assert!(about.title.is_empty());
    assert!(about.links.is_empty());
    assert!(result.render().contains("[failed: request failed: connection reset]"));

    let payloads = sink.payloads();
    assert!(matches!(payloads.first(), Some(EventPayload::CrawlStarted { .. })));
    assert!(
        payloads
            .iter()
            .any(|payload| matches!(payload, EventPayload::PageFailed { depth: 1, .. }))
    );
    assert!(matches!(
        payloads.last(),
        Some(EventPayload::CrawlFinished {
            pages: 3,
            truncated: false,
            synthesis_unavailable: false
        })
    ));
    assert!(sink.events().iter().all(|event| event.conversation_id == "chat"));
}

/// Slow pages time out individually; a slow seed aborts the crawl.
#[tokio::test]
async fn timeouts_follow_seed_rules() {
    let options = CrawlOptions {
        seed_timeout: Duration::from_millis(50),
        page_timeout: Duration::from_millis(50),
        synthesis_max_chars: 10_000,
    };

    let slow_page = site().with_delay("https://site.test/pricing", Duration::from_secs(5));
    let crawler =
        orchestrator(slow_page, FixedSummarizer::new("summary")).with_options(options.clone());
    let result = crawler
        .crawl("https://site.test/", 3, 1)
        .await
        .expect("crawl");
    let pricing = &result.pages[2];
    assert_eq!(pricing.error.as_deref(), Some("timed out after 50 ms"));

    let slow_seed = site().with_delay("https://site.test/", Duration::from_secs(5));
    let crawler = orchestrator(slow_seed, FixedSummarizer::new("summary")).with_options(options);
    let err = crawler
        .crawl("https://site.test/", 3, 1)
        .await
        .expect_err("seed timeout");
    assert!(matches!(err, CrawlError::SeedUnreachable { .. }));
}

/// Summarizer failure leaves the crawl usable with a flag set.
#[tokio::test]
async fn synthesis_failure_is_not_fatal() {
    let crawler = CrawlOrchestrator::new(
        Arc::new(site()),
        Arc::new(FailingSummarizer::new("model offline")),
    );

    let result = crawler
        .crawl("https://site.test/", 3, 1)
        .await
        .expect("crawl");

    assert!(result.synthesis_unavailable);
    assert_eq!(result.synthesis, "");
    assert_eq!(result.pages.len(), 3);
    assert!(result.render().contains("(synthesis unavailable)"));
}

/// Synthesis input drops the oldest page texts first.
#[tokio::test]
async fn synthesis_input_is_bounded() {
    let summarizer = FixedSummarizer::new("summary");
    let crawler = orchestrator(site(), summarizer.clone()).with_options(CrawlOptions {
        synthesis_max_chars: 45,
        ..CrawlOptions::default()
    });

    crawler
        .crawl("https://site.test/", 3, 1)
        .await
        .expect("crawl");

    assert_eq!(
        summarizer.inputs(),
        vec![vec![
            "Founded in 2020.".to_string(),
            "Widgets cost ten credits.".to_string()
        ]]
    );
}

/// Excluded paths are never fetched.
#[tokio::test]
async fn link_policy_exclusions_apply() {
    let fetcher = site();
    let crawler = orchestrator(fetcher.clone(), FixedSummarizer::new("summary")).with_link_policy(
        LinkPolicy {
            exclude_patterns: vec!["/pricing".to_string()],
            ..LinkPolicy::default()
        },
    );

    let result = crawler
        .crawl("https://site.test/", 5, 2)
        .await
        .expect("crawl");

    assert!(
        fetcher
            .calls()
            .iter()
            .all(|url| !url.contains("/pricing"))
    );
    assert_eq!(result.pages.len(), 3);
}
