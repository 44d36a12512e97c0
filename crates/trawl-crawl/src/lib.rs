//! Bounded breadth-first site crawling for trawl.
//!
//! The orchestrator walks a site from a seed URL, visiting at most
//! `max_pages` pages no deeper than `max_depth` links from the seed, then
//! asks a summarizer for a synthesis of everything it read.

pub mod canonical;
pub mod error;
pub mod fetch;
pub mod links;
pub mod orchestrator;
pub mod result;
pub mod summarize;

pub use canonical::{canonicalize, canonicalize_str};
pub use error::{CrawlError, FetchError, SummarizeError};
pub use fetch::{FetchedPage, HttpPageFetcher, PageFetcher, extract_page};
pub use links::LinkPolicy;
pub use orchestrator::{CrawlOptions, CrawlOrchestrator};
pub use result::{CrawlResult, PageRecord};
pub use summarize::{ExtractiveSummarizer, Summarizer, bound_texts};
