//! Publish-date parsing and the freshness window
//!
//! Sites print dates in their own formats ("Mar 5, 2025", "5 Mar 2025",
//! "05-03-2025", ...). Each site lists its candidate `chrono` formats in
//! order; the first that parses wins. A listing is fresh while
//! `publish_date + window` is strictly after today.

use chrono::{Local, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ExtractError, ExtractResult};
use crate::utils::constants::FRESHNESS_WINDOW_MONTHS;
use crate::utils::string_utils::collapse_whitespace;

/// Formats tried when a site does not list its own
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%b %d, %Y", "%d %b %Y"];

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("Invalid parenthesized text regex"));

/// Parse `text` against `formats` in order.
///
/// Parenthesized remarks ("(3 days ago)") are dropped first. Leading labels
/// such as "Posted on" are tolerated: if the whole text does not parse, each
/// format is also tried against the text's tail (the last N words, N being
/// the word count of the format).
pub fn parse_publish_date<S: AsRef<str>>(text: &str, formats: &[S]) -> ExtractResult<NaiveDate> {
    let cleaned = collapse_whitespace(&PARENTHESIZED.replace_all(text, " "));

    for format in formats {
        let format = format.as_ref();
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Ok(date);
        }
        if let Some(tail) = tail_matching(&cleaned, format)
            && let Ok(date) = NaiveDate::parse_from_str(&tail, format)
        {
            return Ok(date);
        }
    }

    Err(ExtractError::UnparseableDate {
        text: cleaned,
        formats: formats.len(),
    })
}

/// Last words of `text`, as many as a date in `format` spans.
fn tail_matching(text: &str, format: &str) -> Option<String> {
    let words = format.split_whitespace().count();
    let total = text.split_whitespace().count();
    if total <= words {
        return None;
    }

    let tail: Vec<&str> = text.split_whitespace().skip(total - words).collect();
    Some(tail.join(" "))
}

/// Accepts or rejects listings by publish date
#[derive(Debug, Clone, Copy)]
pub struct FreshnessFilter {
    window: Months,
    today: Option<NaiveDate>,
}

impl Default for FreshnessFilter {
    fn default() -> Self {
        Self::new(FRESHNESS_WINDOW_MONTHS)
    }
}

impl FreshnessFilter {
    #[must_use]
    pub fn new(window_months: u32) -> Self {
        Self {
            window: Months::new(window_months),
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// `published + window` is strictly after today.
    #[must_use]
    pub fn is_admissible(&self, published: NaiveDate) -> bool {
        match published.checked_add_months(self.window) {
            Some(expires) => expires > self.today(),
            // Overflow means a date so far in the future it cannot be stale
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn one_month_old_is_admitted() {
        let filter = FreshnessFilter::default().with_today(date(2025, 6, 15));
        assert!(filter.is_admissible(date(2025, 5, 15)));
    }

    #[test]
    fn three_months_old_is_rejected() {
        let filter = FreshnessFilter::default().with_today(date(2025, 6, 15));
        assert!(!filter.is_admissible(date(2025, 3, 15)));
    }

    #[test]
    fn exactly_two_months_is_rejected() {
        let filter = FreshnessFilter::default().with_today(date(2025, 6, 15));
        assert!(!filter.is_admissible(date(2025, 4, 15)));
        assert!(filter.is_admissible(date(2025, 4, 16)));
    }

    #[test]
    fn month_end_clamps() {
        // Dec 31 + 2 months clamps to Feb 28
        let filter = FreshnessFilter::default().with_today(date(2025, 2, 27));
        assert!(filter.is_admissible(date(2024, 12, 31)));
        let filter = filter.with_today(date(2025, 2, 28));
        assert!(!filter.is_admissible(date(2024, 12, 31)));
    }

    #[test]
    fn parses_site_formats() -> anyhow::Result<()> {
        assert_eq!(parse_publish_date("Mar 5, 2025", &["%b %d, %Y"])?, date(2025, 3, 5));
        assert_eq!(parse_publish_date("March 5, 2025", &["%B %d, %Y"])?, date(2025, 3, 5));
        assert_eq!(parse_publish_date("5 Mar 2025", &["%d %b %Y"])?, date(2025, 3, 5));
        assert_eq!(parse_publish_date("05-03-2025", &["%d-%m-%Y"])?, date(2025, 3, 5));
        assert_eq!(parse_publish_date(" 2025-03-05 ", DEFAULT_DATE_FORMATS)?, date(2025, 3, 5));
        Ok(())
    }

    #[test]
    fn first_matching_format_wins() -> anyhow::Result<()> {
        // Ambiguous day/month: order decides
        assert_eq!(parse_publish_date("04/03/2025", &["%d/%m/%Y", "%m/%d/%Y"])?, date(2025, 3, 4));
        assert_eq!(parse_publish_date("04/03/2025", &["%m/%d/%Y", "%d/%m/%Y"])?, date(2025, 4, 3));
        Ok(())
    }

    #[test]
    fn leading_label_is_ignored() -> anyhow::Result<()> {
        assert_eq!(
            parse_publish_date("Posted on  12 Feb 2025", &["%d %b %Y"])?,
            date(2025, 2, 12)
        );
        Ok(())
    }

    #[test]
    fn parenthesized_remarks_are_ignored() -> anyhow::Result<()> {
        assert_eq!(
            parse_publish_date("05/14/2025 (4 days ago)", &["%m/%d/%Y"])?,
            date(2025, 5, 14)
        );
        Ok(())
    }

    #[test]
    fn exhausting_formats_is_an_error() {
        let err = parse_publish_date("yesterday", &["%d/%m/%Y", "%Y-%m-%d"]).unwrap_err();
        assert!(matches!(err, ExtractError::UnparseableDate { formats: 2, .. }));
    }
}
