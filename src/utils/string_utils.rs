//! Text cleanup helpers shared by extractors and the location resolver

use super::constants::UNKNOWN;

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// # Examples
/// ```
/// # use job_harvest::utils::string_utils::collapse_whitespace;
/// assert_eq!(collapse_whitespace("  Saint \n  Denis "), "Saint Denis");
/// ```
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned text, or the sentinel when nothing is left.
#[must_use]
pub fn or_unknown(s: Option<&str>) -> String {
    match s.map(collapse_whitespace) {
        Some(text) if !text.is_empty() => text,
        _ => UNKNOWN.to_string(),
    }
}

/// True for the sentinel and for blank text.
#[inline]
#[must_use]
pub fn is_unknown(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t.eq_ignore_ascii_case(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_become_sentinel() {
        assert_eq!(or_unknown(None), "N/A");
        assert_eq!(or_unknown(Some(" \t\n")), "N/A");
        assert_eq!(or_unknown(Some(" CDI ")), "CDI");
    }

    #[test]
    fn sentinel_detection_ignores_case() {
        assert!(is_unknown("n/a"));
        assert!(is_unknown("   "));
        assert!(!is_unknown("Lyon"));
    }
}
