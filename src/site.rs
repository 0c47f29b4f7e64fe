//! Per-site capability description
//!
//! A [`SiteSpec`] is everything that differs between career sites: where the
//! search starts, which dialogs to dismiss, where each field lives, how dates
//! are printed and how pages advance. The pipeline itself is generic; adding a
//! site means writing one of these, not another collector.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::extract::{
    DetailExtractor, DetailSelectors, ListingExtractor, ListingSelectors, parse_selector,
};
use crate::freshness::DEFAULT_DATE_FORMATS;
use crate::pagination::{CrawlMode, PaginationController, PaginationStrategy};
use crate::session::WaitSettings;
use crate::utils::url_utils::is_valid_url;

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| (*f).to_string()).collect()
}

fn default_admit_undated() -> bool {
    true
}

/// How a row's location text becomes a (city, country) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMode {
    /// One text, "City - Country" or "City, Region, Country"
    #[default]
    Split,
    /// Separate city (`location`) and `country` fields
    Columns,
    /// The text is a city; the country comes from the resolver
    ResolveCity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpec {
    /// Short identifier used in config and logs
    pub name: String,
    /// Company stored on every posting from this site
    pub company: String,
    pub start_url: String,
    /// Smaller first page used in sample mode (e.g. a lower `size=` param)
    #[serde(default)]
    pub sample_start_url: Option<String>,
    /// Consent buttons clicked if they show up
    #[serde(default)]
    pub consent_selectors: Vec<String>,
    /// Chat widgets and banners hidden before interacting
    #[serde(default)]
    pub overlay_selectors: Vec<String>,
    /// Iframe whose document holds listings and details
    #[serde(default)]
    pub frame_selector: Option<String>,
    pub listing: ListingSelectors,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub location_mode: LocationMode,
    #[serde(default)]
    pub pagination: PaginationStrategy,
    pub detail: DetailSelectors,
    /// Keep listings whose date cell is empty
    #[serde(default = "default_admit_undated")]
    pub admit_undated: bool,
}

impl SiteSpec {
    #[must_use]
    pub fn start_url_for(&self, mode: CrawlMode) -> &str {
        match (&self.sample_start_url, mode.is_sample()) {
            (Some(sample), true) => sample,
            _ => &self.start_url,
        }
    }

    /// Check URLs and the date format list; selectors are checked by
    /// [`CompiledSite::compile`].
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("site name is empty".to_string());
        }
        for url in std::iter::once(&self.start_url).chain(self.sample_start_url.iter()) {
            if !is_valid_url(url) {
                return Err(format!("start URL '{url}' is not an http(s) URL"));
            }
        }
        if self.date_formats.is_empty() {
            return Err("no date formats".to_string());
        }
        if self.detail.description.is_empty() {
            return Err("no description selector".to_string());
        }
        Ok(())
    }
}

/// A [`SiteSpec`] with every selector parsed
#[derive(Debug, Clone)]
pub struct CompiledSite {
    pub spec: SiteSpec,
    pub listing: ListingExtractor,
    pub detail: DetailExtractor,
    pub pagination: PaginationController,
    pub(crate) frame: Option<Selector>,
}

impl CompiledSite {
    pub fn compile(spec: SiteSpec, wait: WaitSettings) -> ExtractResult<Self> {
        let listing = ListingExtractor::new(&spec.listing)?;
        let detail = DetailExtractor::new(&spec.detail)?;
        let pagination =
            PaginationController::new(spec.pagination.clone(), &spec.listing.item, wait)?;
        let frame = spec.frame_selector.as_deref().map(parse_selector).transpose()?;

        Ok(Self {
            spec,
            listing,
            detail,
            pagination,
            frame,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// `src` of the site's iframe in `html`, if the site declares one.
    pub(crate) fn frame_source(&self, html: &str) -> Option<ExtractResult<String>> {
        let selector = self.frame.as_ref()?;
        let document = scraper::Html::parse_document(html);
        let src = document
            .select(selector)
            .next()
            .and_then(|frame| frame.value().attr("src"))
            .map(str::to_string);
        Some(src.ok_or(ExtractError::MissingField("frame src")))
    }
}
