//! Error types for the router and dispatcher.

use thiserror::Error;
use trawl_crawl::CrawlError;
use trawl_memory::MemoryError;

/// Errors returned by `DecisionRouter::handle`.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The seed page of a requested crawl could not be fetched.
    #[error("seed unreachable {url}: {reason}")]
    SeedUnreachable { url: String, reason: String },
    /// The memory store failed to record the turn.
    #[error("memory store unavailable: {0}")]
    StoreUnavailable(#[source] MemoryError),
    /// A crawl is already running for this conversation.
    #[error("conversation busy: {0}")]
    Busy(String),
    /// The crawl could not start (bad URL or limits).
    #[error("crawl error: {0}")]
    Crawl(#[source] CrawlError),
}

impl RouterError {
    /// Text safe to show the person on the other end of the conversation.
    pub fn user_message(&self) -> String {
        match self {
            Self::SeedUnreachable { url, .. } => {
                format!("I could not reach the site at {url}. Please check the link and try again.")
            }
            Self::StoreUnavailable(_) => {
                "Something went wrong on my side and this turn was not remembered. Please send it again."
                    .to_string()
            }
            Self::Busy(_) => {
                "I'm still reading a site for this chat and a crawl is already running. Ask again once it finishes."
                    .to_string()
            }
            Self::Crawl(CrawlError::InvalidSeed { url, .. }) => {
                format!("{url} does not look like a web address I can open.")
            }
            Self::Crawl(_) => "I could not start that crawl.".to_string(),
        }
    }
}

impl From<CrawlError> for RouterError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::SeedUnreachable { url, reason } => Self::SeedUnreachable { url, reason },
            other => Self::Crawl(other),
        }
    }
}

/// Errors returned by a responder backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResponderError {
    /// The backend failed to produce text.
    #[error("responder failed: {0}")]
    Failed(String),
}

/// Errors returned by a reply transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The segment could not be delivered.
    #[error("send failed: {0}")]
    Send(String),
}
