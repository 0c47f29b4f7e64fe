//! Detail pages → [`JobDetail`]

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CompiledField, FieldSelector, parse_selector};
use crate::error::{ExtractError, ExtractResult};
use crate::utils::url_utils::resolve_link;

static EMPTY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<p(\s[^>]*)?>(\s|&nbsp;|<br\s*/?>)*</p>").expect("Invalid empty paragraph regex")
});

/// Where each detail field lives on the posting page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailSelectors {
    /// Description containers; the inner HTML of every match is concatenated
    pub description: Vec<String>,
    #[serde(default)]
    pub apply_link: Option<FieldSelector>,
    #[serde(default)]
    pub contract_type: Option<FieldSelector>,
    #[serde(default)]
    pub work_mode: Option<FieldSelector>,
    #[serde(default)]
    pub publish_date: Option<FieldSelector>,
    #[serde(default)]
    pub location: Option<FieldSelector>,
}

/// What a detail page adds to its listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetail {
    /// Cleaned description HTML
    pub description: String,
    /// Absolute external apply link
    pub apply_link: Option<String>,
    pub contract_type: Option<String>,
    pub work_mode: Option<String>,
    pub publish_date: Option<String>,
    pub location: Option<String>,
}

/// Strip line breaks and empty paragraphs from description HTML.
#[must_use]
pub fn clean_description(html: &str) -> String {
    let flat: String = html.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    EMPTY_PARAGRAPH.replace_all(&flat, "").trim().to_string()
}

#[derive(Debug, Clone)]
pub struct DetailExtractor {
    description: Vec<Selector>,
    apply_link: Option<CompiledField>,
    contract_type: Option<CompiledField>,
    work_mode: Option<CompiledField>,
    publish_date: Option<CompiledField>,
    location: Option<CompiledField>,
}

impl DetailExtractor {
    pub fn new(selectors: &DetailSelectors) -> ExtractResult<Self> {
        let description = selectors
            .description
            .iter()
            .map(|s| parse_selector(s))
            .collect::<ExtractResult<Vec<_>>>()?;

        let compile = |f: &Option<FieldSelector>| f.as_ref().map(CompiledField::compile).transpose();

        Ok(Self {
            description,
            apply_link: compile(&selectors.apply_link)?,
            contract_type: compile(&selectors.contract_type)?,
            work_mode: compile(&selectors.work_mode)?,
            publish_date: compile(&selectors.publish_date)?,
            location: compile(&selectors.location)?,
        })
    }

    /// Whether the publish date is read here rather than on the listing row.
    #[must_use]
    pub fn has_publish_date(&self) -> bool {
        self.publish_date.is_some()
    }

    /// Extract the posting body and extras from one detail page.
    ///
    /// A page with no description content is an error; every other field
    /// is optional.
    pub fn extract(&self, html: &str, page_url: &Url) -> ExtractResult<JobDetail> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let raw: String = self
            .description
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|element| element.inner_html())
            .collect();
        let description = clean_description(&raw);
        if description.is_empty() {
            return Err(ExtractError::MissingField("description"));
        }

        let apply_link = match self.apply_link.as_ref().and_then(|f| f.value_in(root)) {
            Some(href) => Some(resolve_link(page_url, &href)?),
            None => None,
        };

        let field = |f: &Option<CompiledField>| f.as_ref().and_then(|f| f.value_in(root));

        Ok(JobDetail {
            description,
            apply_link,
            contract_type: field(&self.contract_type),
            work_mode: field(&self.work_mode),
            publish_date: field(&self.publish_date),
            location: field(&self.location),
        })
    }
}
