//! Typed extraction from HTML snapshots
//!
//! Site definitions describe *where* a field lives with a [`FieldSelector`];
//! extractors compile those once and apply them to the HTML the session
//! returned. Nothing here touches the browser.

pub mod detail;
pub mod listing;

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::utils::string_utils::collapse_whitespace;

pub use detail::{DetailExtractor, DetailSelectors, JobDetail, clean_description};
pub use listing::{ListingExtractor, ListingSelectors, ListingSummary, split_location};

/// Where a field's value lives, relative to a listing row or the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSelector {
    /// Text of the first match, or one of its attributes
    ///
    /// The selector `:scope` addresses the listing row itself.
    Css {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attr: Option<String>,
    },
    /// Value element following a label element whose text is one of `labels`
    ///
    /// Covers `<dt>Lieu de travail</dt><dd>Paris</dd>` style detail blocks.
    Labeled {
        labels: Vec<String>,
        #[serde(default = "default_label_selector")]
        label_selector: String,
    },
    /// Text of the first match containing one of `keywords`, any case
    ///
    /// With `exclude`, the first match containing none of them. Covers tag
    /// lists where contract type and location share one element type.
    Keyword {
        selector: String,
        keywords: Vec<String>,
        #[serde(default)]
        exclude: bool,
    },
    /// Text of the first match, cut at the last `separator`
    ///
    /// Covers headings like `"Data Engineer, CDI"` that carry two fields.
    Split {
        selector: String,
        separator: String,
        part: SplitPart,
    },
}

/// Which side of a [`FieldSelector::Split`] to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPart {
    /// Text before the separator; the whole text when it is absent
    Before,
    /// Text after the separator; nothing when it is absent
    After,
}

fn default_label_selector() -> String {
    "dt".to_string()
}

impl FieldSelector {
    /// Text of the first element matching `selector`.
    pub fn css(selector: impl Into<String>) -> Self {
        FieldSelector::Css {
            selector: selector.into(),
            attr: None,
        }
    }

    /// Attribute of the first element matching `selector`.
    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        FieldSelector::Css {
            selector: selector.into(),
            attr: Some(attr.into()),
        }
    }

    /// `<dt>`/`<dd>` pair matched by any of `labels`, case-insensitively.
    pub fn labeled<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelector::Labeled {
            labels: labels.into_iter().map(Into::into).collect(),
            label_selector: default_label_selector(),
        }
    }

    /// First match whose text contains any of `keywords`.
    pub fn keyword<I, S>(selector: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelector::Keyword {
            selector: selector.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            exclude: false,
        }
    }

    /// First match whose text contains none of `keywords`.
    pub fn without_keywords<I, S>(selector: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelector::Keyword {
            selector: selector.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            exclude: true,
        }
    }

    /// One side of the first match's text, cut at the last `separator`.
    pub fn split(selector: impl Into<String>, separator: impl Into<String>, part: SplitPart) -> Self {
        FieldSelector::Split {
            selector: selector.into(),
            separator: separator.into(),
            part,
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> ExtractResult<Selector> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

/// A [`FieldSelector`] with its CSS parsed
#[derive(Debug, Clone)]
pub(crate) enum CompiledField {
    Scope {
        attr: Option<String>,
    },
    Css {
        selector: Selector,
        attr: Option<String>,
    },
    Labeled {
        labels: Vec<String>,
        label_selector: Selector,
    },
    Keyword {
        selector: Selector,
        keywords: Vec<String>,
        exclude: bool,
    },
    Split {
        selector: Selector,
        separator: String,
        part: SplitPart,
    },
}

impl CompiledField {
    pub(crate) fn compile(field: &FieldSelector) -> ExtractResult<Self> {
        Ok(match field {
            FieldSelector::Css { selector, attr } if selector.trim() == ":scope" => {
                CompiledField::Scope { attr: attr.clone() }
            }
            FieldSelector::Css { selector, attr } => CompiledField::Css {
                selector: parse_selector(selector)?,
                attr: attr.clone(),
            },
            FieldSelector::Labeled {
                labels,
                label_selector,
            } => CompiledField::Labeled {
                labels: labels.iter().map(|l| normalize_label(l)).collect(),
                label_selector: parse_selector(label_selector)?,
            },
            FieldSelector::Keyword {
                selector,
                keywords,
                exclude,
            } => CompiledField::Keyword {
                selector: parse_selector(selector)?,
                keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
                exclude: *exclude,
            },
            FieldSelector::Split {
                selector,
                separator,
                part,
            } => CompiledField::Split {
                selector: parse_selector(selector)?,
                separator: separator.clone(),
                part: *part,
            },
        })
    }

    /// Cleaned value inside `scope`; blank values count as absent.
    pub(crate) fn value_in(&self, scope: ElementRef<'_>) -> Option<String> {
        let raw = match self {
            CompiledField::Scope { attr } => match attr {
                Some(name) => scope.value().attr(name).map(str::to_string),
                None => Some(scope.text().collect::<String>()),
            },
            CompiledField::Css { selector, attr } => {
                let element = scope.select(selector).next()?;
                match attr {
                    Some(name) => element.value().attr(name).map(str::to_string),
                    None => Some(element.text().collect::<String>()),
                }
            }
            CompiledField::Labeled {
                labels,
                label_selector,
            } => scope.select(label_selector).find_map(|label| {
                let text = normalize_label(&label.text().collect::<String>());
                if !labels.contains(&text) {
                    return None;
                }
                label
                    .next_siblings()
                    .find_map(ElementRef::wrap)
                    .map(|value| value.text().collect::<String>())
            }),
            CompiledField::Keyword {
                selector,
                keywords,
                exclude,
            } => scope
                .select(selector)
                .map(|element| element.text().collect::<String>())
                .find(|text| {
                    let text = text.to_lowercase();
                    keywords.iter().any(|k| text.contains(k.as_str())) != *exclude
                }),
            CompiledField::Split {
                selector,
                separator,
                part,
            } => {
                let text = scope.select(selector).next()?.text().collect::<String>();
                match (text.rsplit_once(separator.as_str()), part) {
                    (Some((before, _)), SplitPart::Before) => Some(before.to_string()),
                    (Some((_, after)), SplitPart::After) => Some(after.to_string()),
                    (None, SplitPart::Before) => Some(text),
                    (None, SplitPart::After) => None,
                }
            }
        }?;

        let cleaned = collapse_whitespace(&raw);
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

/// Lowercase, collapse whitespace, drop a trailing colon.
fn normalize_label(text: &str) -> String {
    collapse_whitespace(text)
        .trim_end_matches(':')
        .trim_end()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn labeled_field_reads_following_value() -> anyhow::Result<()> {
        let doc = Html::parse_document(
            r#"<dl>
                 <dt>Type d’emploi</dt><dd>CDI</dd>
                 <dt>Lieu de travail :</dt>
                 <dd> Toulouse </dd>
               </dl>"#,
        );
        let field = CompiledField::compile(&FieldSelector::labeled(["job locations", "Lieu de travail"]))?;
        assert_eq!(field.value_in(doc.root_element()), Some("Toulouse".to_string()));

        let missing = CompiledField::compile(&FieldSelector::labeled(["salary"]))?;
        assert_eq!(missing.value_in(doc.root_element()), None);
        Ok(())
    }

    #[test]
    fn css_field_reads_text_or_attribute() -> anyhow::Result<()> {
        let doc = Html::parse_document(r#"<div><a class="t" href="/job/1"> Data   Engineer </a></div>"#);
        let text = CompiledField::compile(&FieldSelector::css("a.t"))?;
        let href = CompiledField::compile(&FieldSelector::attr("a.t", "href"))?;
        assert_eq!(text.value_in(doc.root_element()), Some("Data Engineer".to_string()));
        assert_eq!(href.value_in(doc.root_element()), Some("/job/1".to_string()));

        let row = doc
            .select(&parse_selector("a.t")?)
            .next()
            .expect("row present");
        let own = CompiledField::compile(&FieldSelector::attr(":scope", "href"))?;
        assert_eq!(own.value_in(row), Some("/job/1".to_string()));
        Ok(())
    }

    #[test]
    fn keyword_field_classifies_shared_tags() -> anyhow::Result<()> {
        let doc = Html::parse_document(
            r#"<div class="tags">
                 <span>12-05-2025</span>
                 <span>Lyon</span>
                 <span>CDI - Temps plein</span>
               </div>"#,
        );
        let tags = "div.tags > span:not(:first-child)";
        let contract = CompiledField::compile(&FieldSelector::keyword(tags, ["CDI", "freelance"]))?;
        let location = CompiledField::compile(&FieldSelector::without_keywords(tags, ["CDI", "freelance"]))?;

        assert_eq!(contract.value_in(doc.root_element()), Some("CDI - Temps plein".to_string()));
        assert_eq!(location.value_in(doc.root_element()), Some("Lyon".to_string()));

        let none = CompiledField::compile(&FieldSelector::keyword(tags, ["stage"]))?;
        assert_eq!(none.value_in(doc.root_element()), None);
        Ok(())
    }

    #[test]
    fn split_field_cuts_at_last_separator() -> anyhow::Result<()> {
        let doc = Html::parse_document(
            r#"<h2 class="a">Consultant Cloud, Data, CDI</h2><h2 class="b">Consultant</h2>"#,
        );
        let title = CompiledField::compile(&FieldSelector::split("h2.a", ",", SplitPart::Before))?;
        let contract = CompiledField::compile(&FieldSelector::split("h2.a", ",", SplitPart::After))?;
        assert_eq!(title.value_in(doc.root_element()), Some("Consultant Cloud, Data".to_string()));
        assert_eq!(contract.value_in(doc.root_element()), Some("CDI".to_string()));

        let whole = CompiledField::compile(&FieldSelector::split("h2.b", ",", SplitPart::Before))?;
        let missing = CompiledField::compile(&FieldSelector::split("h2.b", ",", SplitPart::After))?;
        assert_eq!(whole.value_in(doc.root_element()), Some("Consultant".to_string()));
        assert_eq!(missing.value_in(doc.root_element()), None);
        Ok(())
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = CompiledField::compile(&FieldSelector::css("div[")).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSelector { .. }));
    }

    #[test]
    fn field_selector_deserializes_from_json() -> anyhow::Result<()> {
        let field: FieldSelector =
            serde_json::from_str(r#"{"kind": "css", "selector": "a.title", "attr": "href"}"#)?;
        assert_eq!(field, FieldSelector::attr("a.title", "href"));

        let field: FieldSelector = serde_json::from_str(r#"{"kind": "labeled", "labels": ["job locations"]}"#)?;
        assert_eq!(field, FieldSelector::labeled(["job locations"]));

        let field: FieldSelector = serde_json::from_str(
            r#"{"kind": "split", "selector": "h2", "separator": ",", "part": "after"}"#,
        )?;
        assert_eq!(field, FieldSelector::split("h2", ",", SplitPart::After));
        Ok(())
    }
}
