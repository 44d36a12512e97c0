//! Page fetch interface and the HTTP implementation.

use crate::error::FetchError;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Text, title and outbound links of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub text: String,
    pub title: String,
    /// Absolute or page-relative hrefs in document order.
    pub links: Vec<String>,
}

/// Page fetch capability used by the crawl orchestrator.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL. Returns before the orchestrator moves on.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Fetches pages over HTTP and extracts readable text with `scraper`.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
    max_text_chars: usize,
    max_links: usize,
}

impl HttpPageFetcher {
    /// Build a fetcher with a request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| FetchError::Request(err.to_string()))?;
        Ok(Self {
            client,
            max_body_bytes: 2 * 1024 * 1024,
            max_text_chars: 50_000,
            max_links: 50,
        })
    }

    /// Cap extracted text and links per page.
    pub fn with_limits(mut self, max_text_chars: usize, max_links: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self.max_links = max_links;
        self
    }

    /// Cap the number of body bytes read before parsing.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            && !content_type.contains("html")
            && !content_type.starts_with("text/")
        {
            return Err(FetchError::Unsupported(content_type.to_string()));
        }
        let final_url = response.url().clone();

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| FetchError::Request(err.to_string()))?;
            let remaining = self.max_body_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if body.len() >= self.max_body_bytes {
                break;
            }
        }
        let html = String::from_utf8_lossy(&body);
        let page = extract_page(&html, &final_url, self.max_text_chars, self.max_links);
        debug!(
            "fetched page (url={}, bytes={}, text_len={}, links={})",
            final_url,
            body.len(),
            page.text.len(),
            page.links.len()
        );
        Ok(page)
    }
}

/// Extract title, visible text and http(s) links from an HTML document.
///
/// Text lines are trimmed and blank lines dropped; text is capped at
/// `max_chars` characters and links at `max_links`, resolved against `base`.
pub fn extract_page(html: &str, base: &Url, max_chars: usize, max_links: usize) -> FetchedPage {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| element.text().collect::<String>())
        })
        .map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let mut lines = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        for line in text.lines() {
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
    }
    let text: String = lines.join("\n").chars().take(max_chars).collect();

    let mut links = Vec::new();
    if let Ok(selector) = Selector::parse("a[href]") {
        let mut seen = HashSet::new();
        for element in document.select(&selector) {
            if links.len() >= max_links {
                break;
            }
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(absolute) = base.join(href.trim()) else {
                continue;
            };
            if !matches!(absolute.scheme(), "http" | "https") {
                continue;
            }
            let absolute = absolute.to_string();
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    }

    FetchedPage { text, title, links }
}
