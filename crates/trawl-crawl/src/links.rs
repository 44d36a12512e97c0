//! Which discovered links a crawl may follow, and in what order.

use crate::canonical::canonicalize;
use std::collections::HashSet;
use url::Url;

/// Same-site link filter with exclusions and optional keyword priority.
#[derive(Debug, Clone, Default)]
pub struct LinkPolicy {
    /// Case-insensitive substrings of the absolute URL that are never followed.
    pub exclude_patterns: Vec<String>,
    /// Reorder links by keyword priority; off keeps discovery order.
    pub prioritize: bool,
    pub priority_keywords: Vec<String>,
}

impl LinkPolicy {
    /// Resolve, filter and canonicalize a page's links.
    ///
    /// Keeps http(s) links on the seed's host (a leading `www.` is ignored on
    /// both sides), drops excluded ones and duplicates within the page.
    pub fn select(&self, seed: &Url, page: &Url, links: &[String]) -> Vec<Url> {
        let Some(seed_host) = site_host(seed) else {
            return Vec::new();
        };
        let excludes: Vec<String> = self
            .exclude_patterns
            .iter()
            .map(|pattern| pattern.to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for link in links {
            let Ok(absolute) = page.join(link.trim()) else {
                continue;
            };
            if !matches!(absolute.scheme(), "http" | "https") {
                continue;
            }
            if site_host(&absolute).as_deref() != Some(seed_host.as_str()) {
                continue;
            }
            let canonical = canonicalize(&absolute);
            let lowered = canonical.as_str().to_lowercase();
            if excludes.iter().any(|pattern| lowered.contains(pattern)) {
                continue;
            }
            if seen.insert(canonical.as_str().to_string()) {
                selected.push(canonical);
            }
        }

        if self.prioritize {
            selected.sort_by_key(|url| std::cmp::Reverse(self.priority(url)));
        }
        selected
    }

    /// +10 for a `/keyword` in the URL, minus one per `/`.
    fn priority(&self, url: &Url) -> i64 {
        let lowered = url.as_str().to_lowercase();
        let keyword_bonus = if self
            .priority_keywords
            .iter()
            .any(|keyword| lowered.contains(&format!("/{}", keyword.to_lowercase())))
        {
            10
        } else {
            0
        };
        keyword_bonus - lowered.matches('/').count() as i64
    }
}

fn site_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("url")
    }

    fn strings(urls: &[Url]) -> Vec<&str> {
        urls.iter().map(Url::as_str).collect()
    }

    fn links(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn keeps_same_site_links_in_discovery_order() {
        let seed = url("https://site.test/");
        let page = url("https://site.test/blog/");
        let policy = LinkPolicy::default();
        let selected = policy.select(
            &seed,
            &page,
            &links(&[
                "post-1",
                "/about#team",
                "https://www.site.test/faq/",
                "https://other.test/",
                "mailto:hi@site.test",
                "/about",
            ]),
        );
        assert_eq!(
            strings(&selected),
            vec![
                "https://site.test/blog/post-1",
                "https://site.test/about",
                "https://www.site.test/faq",
            ]
        );
    }

    #[test]
    fn excludes_patterns_case_insensitively() {
        let seed = url("https://site.test/");
        let policy = LinkPolicy {
            exclude_patterns: vec!["/login".to_string()],
            ..LinkPolicy::default()
        };
        let selected = policy.select(&seed, &seed, &links(&["/LOGIN", "/docs"]));
        assert_eq!(strings(&selected), vec!["https://site.test/docs"]);
    }

    #[test]
    fn prioritizes_keyword_links_when_enabled() {
        let seed = url("https://site.test/");
        let policy = LinkPolicy {
            prioritize: true,
            priority_keywords: vec!["docs".to_string()],
            ..LinkPolicy::default()
        };
        let selected = policy.select(
            &seed,
            &seed,
            &links(&["/a/b/c", "/pricing", "/docs/start"]),
        );
        assert_eq!(
            strings(&selected),
            vec![
                "https://site.test/docs/start",
                "https://site.test/pricing",
                "https://site.test/a/b/c",
            ]
        );
    }
}
