//! Reply composition.
//!
//! The router decides the branch; a responder only writes the text. A model
//! backed responder can be plugged in behind the `Responder` trait, and
//! `TemplateResponder` is the deterministic default and fallback.

use crate::error::ResponderError;
use async_trait::async_trait;
use trawl_crawl::CrawlResult;
use trawl_memory::{MemoryRecord, RecordKind};
use trawl_protocol::{ConversationId, Route};

/// Maximum characters of remembered crawl content quoted in a memory answer.
const MEMORY_QUOTE_CHARS: usize = 3_000;

/// Everything a responder may use to write a reply.
#[derive(Debug, Clone)]
pub struct ResponseRequest {
    pub conversation_id: ConversationId,
    pub question: String,
    pub route: Route,
    /// Retrieved records, best first. Only crawl records on the memory route.
    pub context: Vec<MemoryRecord>,
    /// Recent turns before this one, oldest first, already truncated.
    pub history: Vec<String>,
    /// Fresh crawl on the crawl route.
    pub crawl: Option<CrawlResult>,
}

/// Writes reply text for a routed turn.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError>;
}

/// Fixed-template replies with no model involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResponder;

impl TemplateResponder {
    pub fn render(&self, request: &ResponseRequest) -> String {
        match request.route {
            Route::Memory => render_memory(request),
            Route::Crawl => match &request.crawl {
                Some(result) => render_crawl(result),
                None => "The crawl finished but produced nothing to report.".to_string(),
            },
            Route::Chat => render_chat(request),
        }
    }
}

#[async_trait]
impl Responder for TemplateResponder {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        Ok(self.render(request))
    }
}

fn render_memory(request: &ResponseRequest) -> String {
    let Some(best) = request
        .context
        .iter()
        .find(|record| record.kind == RecordKind::Crawl)
    else {
        return render_chat(request);
    };
    let mut quoted: String = best.content.chars().take(MEMORY_QUOTE_CHARS).collect();
    if best.content.chars().count() > MEMORY_QUOTE_CHARS {
        quoted.push_str("\n...");
    }
    format!("I already looked into this earlier. Here is what I found:\n\n{quoted}")
}

fn render_crawl(result: &CrawlResult) -> String {
    if result.synthesis_unavailable {
        return format!(
            "I visited {} pages starting at {} but could not summarize them. Pages I read:\n{}",
            result.pages.len(),
            result.seed_url,
            result.page_title_list()
        );
    }
    result.render()
}

fn render_chat(request: &ResponseRequest) -> String {
    if request.history.is_empty() {
        "Send me a link (for example https://example.org) and I will read the site and remember what I find."
            .to_string()
    } else {
        "I don't have notes on that yet. Send me a link and I will read the site and remember what I find."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use trawl_crawl::PageRecord;
    use trawl_memory::Author;

    fn request(route: Route) -> ResponseRequest {
        ResponseRequest {
            conversation_id: "chat".to_string(),
            question: "what is on the site".to_string(),
            route,
            context: Vec::new(),
            history: Vec::new(),
            crawl: None,
        }
    }

    fn crawl_result(synthesis_unavailable: bool) -> CrawlResult {
        CrawlResult {
            seed_url: "https://site.test/".to_string(),
            pages: vec![PageRecord {
                url: "https://site.test/".to_string(),
                title: "Home".to_string(),
                text: "Welcome.".to_string(),
                links: Vec::new(),
                depth: 0,
                visited_at: Utc::now(),
                error: None,
            }],
            synthesis: if synthesis_unavailable {
                String::new()
            } else {
                "A test site.".to_string()
            },
            synthesis_unavailable,
            truncated: false,
        }
    }

    #[test]
    fn memory_route_quotes_best_crawl_record() {
        let mut req = request(Route::Memory);
        req.context.push(MemoryRecord {
            id: 2,
            conversation_id: "chat".to_string(),
            author: Author::Agent,
            kind: RecordKind::Crawl,
            content: "Crawl of https://site.test/ (1 pages)".to_string(),
            created_at: Utc::now(),
            persistent: true,
        });
        let text = TemplateResponder.render(&req);
        assert!(text.ends_with("Crawl of https://site.test/ (1 pages)"));
    }

    #[test]
    fn crawl_route_renders_result_or_title_list() {
        let mut req = request(Route::Crawl);
        req.crawl = Some(crawl_result(false));
        assert_eq!(
            TemplateResponder.render(&req),
            crawl_result(false).render()
        );

        req.crawl = Some(crawl_result(true));
        let text = TemplateResponder.render(&req);
        assert!(text.contains("could not summarize"));
        assert!(text.ends_with("1. Home - https://site.test/"));
    }
}
