//! URL helpers for turning scraped hrefs into absolute links.

use url::Url;

use crate::error::{ExtractError, ExtractResult};

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match url::Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
        }
        Err(_) => false,
    }
}

/// Resolve an href found on `base` into an absolute URL string.
///
/// Absolute hrefs are returned as-is (after parsing); relative ones are
/// joined onto `base`. The fragment is dropped so the same posting reached
/// through different anchors compares equal.
pub fn resolve_link(base: &Url, href: &str) -> ExtractResult<String> {
    let href = href.trim();
    let mut resolved = base.join(href).map_err(|source| ExtractError::InvalidLink {
        link: href.to_string(),
        source,
    })?;
    resolved.set_fragment(None);
    Ok(resolved.to_string())
}

/// Replace (or add) one query parameter, keeping the others in order.
#[must_use]
pub fn with_query_param(url: &Url, key: &str, value: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut out = url.clone();
    {
        let mut query = out.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            query.append_pair(k, v);
        }
        query.append_pair(key, value);
    }
    out
}
