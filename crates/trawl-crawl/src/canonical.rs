//! URL canonicalization used as the visited-set key.

use url::Url;

/// Strip the fragment and normalize the trailing slash.
///
/// Host lower-casing and default-port removal are done by the parser for
/// http(s) URLs. The root path stays `/`; any other path loses one trailing
/// `/`. Applying this twice gives the same URL.
pub fn canonicalize(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    let path = canonical.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        canonical.set_path(&trimmed);
    }
    canonical
}

/// Parse and canonicalize; `None` when the text is not an absolute URL.
pub fn canonicalize_str(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .map(|url| canonicalize(&url).to_string())
}
