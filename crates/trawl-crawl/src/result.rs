use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page the crawl visited, successfully or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub text: String,
    /// Same-site links selected from this page, canonical form.
    pub links: Vec<String>,
    /// Depth from the seed; the seed is 0.
    pub depth: usize,
    pub visited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a bounded crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub seed_url: String,
    /// Pages in visit order, seed first.
    pub pages: Vec<PageRecord>,
    pub synthesis: String,
    pub synthesis_unavailable: bool,
    /// More same-site pages were known than the page budget allowed.
    pub truncated: bool,
}

impl CrawlResult {
    /// Plain-text rendering stored in memory and sent back to the user.
    pub fn render(&self) -> String {
        let mut out = format!("Crawl of {} ({} pages", self.seed_url, self.pages.len());
        if self.truncated {
            out.push_str(", truncated");
        }
        out.push_str(")\nSynthesis:\n");
        if self.synthesis_unavailable || self.synthesis.trim().is_empty() {
            out.push_str("(synthesis unavailable)");
        } else {
            out.push_str(self.synthesis.trim());
        }
        out.push_str("\nPages visited:\n");
        out.push_str(&self.page_title_list());
        out
    }

    /// Numbered list of visited pages with titles and failures.
    pub fn page_title_list(&self) -> String {
        self.pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let title = if page.title.trim().is_empty() {
                    "(untitled)"
                } else {
                    page.title.trim()
                };
                match &page.error {
                    Some(error) => format!(
                        "{}. {} - {} [failed: {}]",
                        index + 1,
                        title,
                        page.url,
                        error
                    ),
                    None => format!("{}. {} - {}", index + 1, title, page.url),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Titles of pages that loaded, in visit order.
    pub fn page_titles(&self) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|page| !page.failed() && !page.title.trim().is_empty())
            .map(|page| page.title.trim())
            .collect()
    }
}
