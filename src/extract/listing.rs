//! Listing rows → [`ListingSummary`]

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CompiledField, FieldSelector, parse_selector};
use crate::error::{ExtractError, ExtractResult};
use crate::utils::constants::UNKNOWN;
use crate::utils::string_utils::{collapse_whitespace, or_unknown};
use crate::utils::url_utils::resolve_link;

/// Delimiters tried, in order, when splitting "City - Country" text
const LOCATION_DELIMITERS: &[&str] = &[" - ", ","];

/// One row of a results page
///
/// Optional fields hold [`UNKNOWN`] rather than being absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    /// Raw location text as printed on the row
    pub location: String,
    /// Separate country column, when the site has one
    pub country: String,
    pub contract_type: String,
    pub work_mode: String,
    /// Raw publish-date text, parsed later against the site's formats
    pub publish_date: String,
    /// Absolute link to the detail page
    pub link: String,
}

/// Where each listing field lives inside a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selects every listing row on a results page
    pub item: String,
    pub title: FieldSelector,
    pub link: FieldSelector,
    #[serde(default)]
    pub location: Option<FieldSelector>,
    #[serde(default)]
    pub country: Option<FieldSelector>,
    #[serde(default)]
    pub contract_type: Option<FieldSelector>,
    #[serde(default)]
    pub work_mode: Option<FieldSelector>,
    #[serde(default)]
    pub publish_date: Option<FieldSelector>,
}

/// Split "City - Country" / "City, Region, Country" into (city, country).
///
/// The first delimiter present in the text decides the split: the city is
/// the first segment and the country the last. Text without a delimiter, or
/// with an empty side, yields the sentinel for both.
#[must_use]
pub fn split_location(raw: &str) -> (String, String) {
    let text = collapse_whitespace(raw);

    for delimiter in LOCATION_DELIMITERS {
        if !text.contains(*delimiter) {
            continue;
        }
        let parts: Vec<&str> = text.split(*delimiter).map(str::trim).collect();
        let city = parts.first().copied().unwrap_or_default();
        let country = parts.last().copied().unwrap_or_default();
        if city.is_empty() || country.is_empty() {
            break;
        }
        return (city.to_string(), country.to_string());
    }

    (UNKNOWN.to_string(), UNKNOWN.to_string())
}

/// Compiled [`ListingSelectors`]
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    item: Selector,
    title: CompiledField,
    link: CompiledField,
    location: Option<CompiledField>,
    country: Option<CompiledField>,
    contract_type: Option<CompiledField>,
    work_mode: Option<CompiledField>,
    publish_date: Option<CompiledField>,
}

fn compile_opt(field: Option<&FieldSelector>) -> ExtractResult<Option<CompiledField>> {
    field.map(CompiledField::compile).transpose()
}

impl ListingExtractor {
    pub fn new(selectors: &ListingSelectors) -> ExtractResult<Self> {
        Ok(Self {
            item: parse_selector(&selectors.item)?,
            title: CompiledField::compile(&selectors.title)?,
            link: CompiledField::compile(&selectors.link)?,
            location: compile_opt(selectors.location.as_ref())?,
            country: compile_opt(selectors.country.as_ref())?,
            contract_type: compile_opt(selectors.contract_type.as_ref())?,
            work_mode: compile_opt(selectors.work_mode.as_ref())?,
            publish_date: compile_opt(selectors.publish_date.as_ref())?,
        })
    }

    /// Whether the site prints a publish date on its rows at all.
    #[must_use]
    pub fn has_publish_date(&self) -> bool {
        self.publish_date.is_some()
    }

    /// Extract every row on the page.
    ///
    /// Rows missing a title or link come back as errors so the caller can
    /// log and skip them without losing the rest of the page.
    #[must_use]
    pub fn extract_page(&self, html: &str, page_url: &Url) -> Vec<ExtractResult<ListingSummary>> {
        let document = Html::parse_document(html);

        document
            .select(&self.item)
            .map(|row| -> ExtractResult<ListingSummary> {
                let title = self
                    .title
                    .value_in(row)
                    .ok_or(ExtractError::MissingField("title"))?;
                let href = self
                    .link
                    .value_in(row)
                    .ok_or(ExtractError::MissingField("link"))?;
                let link = resolve_link(page_url, &href)?;

                let field = |f: &Option<CompiledField>| {
                    or_unknown(f.as_ref().and_then(|f| f.value_in(row)).as_deref())
                };

                Ok(ListingSummary {
                    title,
                    location: field(&self.location),
                    country: field(&self.country),
                    contract_type: field(&self.contract_type),
                    work_mode: field(&self.work_mode),
                    publish_date: field(&self.publish_date),
                    link,
                })
            })
            .collect()
    }

    /// Number of listing rows on the page.
    #[must_use]
    pub fn count(&self, html: &str) -> usize {
        Html::parse_document(html).select(&self.item).count()
    }
}
