//! URL variant derivation for retrieval queries.
//!
//! Users rarely type a domain the way it was stored: `clawn.ch` shows up as
//! `clawnch`, `www.example.org` as `example.org`, with or without a scheme.
//! [`derive_variants`] is a pure function from text (plus a [`SuffixTable`]
//! learned from what a conversation has already seen) to the set of
//! normalized URL-like strings that count as a match when found inside a
//! record.

use crate::model::MemoryRecord;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Characters stripped from both ends of a whitespace token before inspection.
const TOKEN_TRIM: &str = "\"'`()[]<>{},;!?.:*";
/// Bare tokens shorter than this never get a suffix reattached.
const MIN_BARE_TOKEN_LEN: usize = 4;

/// Query text plus the URL-like variants derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalQuery {
    pub raw_text: String,
    pub derived_url_variants: BTreeSet<String>,
}

impl RetrievalQuery {
    /// Build a query using only what the text itself contains.
    pub fn from_text(text: impl Into<String>) -> Self {
        let raw_text = text.into();
        let derived_url_variants = derive_variants(&raw_text, &SuffixTable::default());
        Self {
            raw_text,
            derived_url_variants,
        }
    }

    /// Add the variants that the suffix table makes possible.
    pub fn with_suffixes(mut self, suffixes: &SuffixTable) -> Self {
        let extra = derive_variants(&self.raw_text, suffixes);
        self.derived_url_variants.extend(extra);
        self
    }
}

/// Domain suffixes and hosts seen in a conversation (`ch`, `co.uk`, `clawn.ch`).
///
/// A bare token is only read as a host when that exact host already appeared
/// in the conversation, so ordinary words ending in a suffix stay words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixTable {
    suffixes: BTreeSet<String>,
    /// Known hosts keyed by their compact form (`clawnch` -> `clawn.ch`).
    hosts: BTreeMap<String, BTreeSet<String>>,
}

impl SuffixTable {
    /// Learn suffixes and hosts from every URL-like token in the records.
    pub fn from_records(records: &[MemoryRecord]) -> Self {
        let mut table = Self::default();
        for record in records {
            for token in record.content.split_whitespace() {
                if let Some(host) = url_like_host(&normalize_token(token)) {
                    table.learn(&host);
                }
            }
        }
        table
    }

    /// Record a host, its parent domains and its suffixes.
    pub fn learn(&mut self, host: &str) {
        let host = host.strip_prefix("www.").unwrap_or(host);
        let labels: Vec<&str> = host.split('.').collect();
        let Some(last) = labels.last() else {
            return;
        };
        if labels.len() < 2 || !is_tld(last) {
            return;
        }
        self.suffixes.insert(last.to_string());
        if labels.len() >= 3 {
            let second = labels[labels.len() - 2];
            if (2..=3).contains(&second.len()) && second.chars().all(|c| c.is_ascii_alphabetic()) {
                self.suffixes.insert(format!("{second}.{last}"));
            }
        }
        for start in 0..labels.len() - 1 {
            let domain = labels[start..].join(".");
            if self.suffixes.contains(&domain) {
                continue;
            }
            self.hosts
                .entry(compact_host(&domain))
                .or_default()
                .insert(domain);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn contains(&self, suffix: &str) -> bool {
        self.suffixes.contains(suffix)
    }

    /// Whether the host (without `www.`) was seen in the conversation.
    pub fn knows_host(&self, host: &str) -> bool {
        let host = host.strip_prefix("www.").unwrap_or(host);
        self.hosts
            .get(&compact_host(host))
            .is_some_and(|hosts| hosts.contains(host))
    }

    /// Known hosts that a bare token spells without separators.
    fn reattach(&self, bare: &str) -> Vec<String> {
        let Some(hosts) = self.hosts.get(bare) else {
            return Vec::new();
        };
        hosts
            .iter()
            .filter(|host| {
                host.rsplit('.')
                    .next()
                    .is_some_and(|suffix| self.suffixes.contains(suffix))
            })
            .cloned()
            .collect()
    }
}

/// Derive the normalized URL variants of every URL-like token in `text`.
pub fn derive_variants(text: &str, suffixes: &SuffixTable) -> BTreeSet<String> {
    let mut variants = BTreeSet::new();
    for token in text.split_whitespace() {
        let token = normalize_token(token);
        if let Some(host) = url_like_host(&token) {
            push_host_variants(&host, &mut variants);
            let compact = compact_host(host.strip_prefix("www.").unwrap_or(&host));
            if compact.len() >= MIN_BARE_TOKEN_LEN {
                variants.insert(compact);
            }
        } else if token.len() >= MIN_BARE_TOKEN_LEN
            && token.chars().all(|c| c.is_ascii_alphanumeric())
        {
            for host in suffixes.reattach(&token) {
                push_host_variants(&host, &mut variants);
            }
        }
    }
    variants
}

/// Host name of a token that looks like a URL or a bare domain.
pub(crate) fn url_like_host(token: &str) -> Option<String> {
    if token.contains("://") {
        let url = Url::parse(token).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        return is_domain(&host).then_some(host);
    }
    let end = token.find(['/', '?', '#', ':']).unwrap_or(token.len());
    let host = token[..end].to_ascii_lowercase();
    is_domain(&host).then_some(host)
}

/// Dotted forms of a host: bare, `www.` and both schemes.
fn push_host_variants(host: &str, variants: &mut BTreeSet<String>) {
    let bare = host.strip_prefix("www.").unwrap_or(host);
    variants.insert(bare.to_string());
    variants.insert(format!("www.{bare}"));
    variants.insert(format!("https://{bare}"));
    variants.insert(format!("http://{bare}"));
}

fn compact_host(host: &str) -> String {
    host.chars().filter(|c| *c != '.' && *c != '-').collect()
}

fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| TOKEN_TRIM.contains(c))
        .to_lowercase()
}

fn is_domain(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels.last().is_some_and(|last| is_tld(last))
}

fn is_tld(label: &str) -> bool {
    label.len() >= 2 && label.chars().all(|c| c.is_ascii_alphabetic())
}
