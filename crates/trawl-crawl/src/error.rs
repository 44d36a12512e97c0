//! Error types for crawling, fetching and summarizing.

use thiserror::Error;

/// Errors that abort a crawl call.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Seed is not an absolute http(s) URL.
    #[error("invalid seed url {url}: {reason}")]
    InvalidSeed { url: String, reason: String },
    /// Page budget is zero.
    #[error("invalid crawl limits: {0}")]
    InvalidLimits(String),
    /// The seed page could not be fetched.
    #[error("seed unreachable {url}: {reason}")]
    SeedUnreachable { url: String, reason: String },
}

/// Errors returned by a page fetcher for a single URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("request failed: {0}")]
    Request(String),
    /// Server answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),
    /// Fetch did not finish within the page timeout.
    #[error("timed out after {0} ms")]
    Timeout(u64),
    /// Response was not a page we can read.
    #[error("unsupported content: {0}")]
    Unsupported(String),
}

/// Errors returned by a summarizer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SummarizeError {
    /// Every page text was empty.
    #[error("nothing to summarize")]
    EmptyInput,
    /// The summarization backend failed.
    #[error("summarizer failed: {0}")]
    Failed(String),
}
