//! Country-name canonicalization
//!
//! Career sites and the geocoder disagree on spellings ("Czechia" vs
//! "Czech Republic", local-language names), and some boards print ISO
//! 3166-1 alpha-2 codes ("Graz, AT") instead of names. Lookups are an exact,
//! case-insensitive match on the trimmed text; anything not in the table is
//! left to the caller.

use std::collections::HashMap;

use crate::utils::string_utils::collapse_whitespace;

/// Built-in alias → canonical name pairs
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("czechia", "Czech Republic"),
    ("česko", "Czech Republic"),
    ("deutschland", "Germany"),
    ("österreich", "Austria"),
    ("osterreich", "Austria"),
    ("españa", "Spain"),
    ("espana", "Spain"),
    ("italia", "Italy"),
    ("belgique", "Belgium"),
    ("belgië", "Belgium"),
    ("nederland", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("schweiz", "Switzerland"),
    ("suisse", "Switzerland"),
    ("polska", "Poland"),
    ("maroc", "Morocco"),
    ("tunisie", "Tunisia"),
    ("uk", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("usa", "United States"),
    ("united states of america", "United States"),
];

/// ISO 3166-1 alpha-2 code → canonical name, for the countries the built-in
/// boards post from
const ISO_CODES: &[(&str, &str)] = &[
    ("at", "Austria"),
    ("be", "Belgium"),
    ("bg", "Bulgaria"),
    ("br", "Brazil"),
    ("ca", "Canada"),
    ("ch", "Switzerland"),
    ("cn", "China"),
    ("cz", "Czech Republic"),
    ("de", "Germany"),
    ("dk", "Denmark"),
    ("es", "Spain"),
    ("fi", "Finland"),
    ("fr", "France"),
    ("gb", "United Kingdom"),
    ("gr", "Greece"),
    ("hr", "Croatia"),
    ("hu", "Hungary"),
    ("ie", "Ireland"),
    ("in", "India"),
    ("it", "Italy"),
    ("jp", "Japan"),
    ("kr", "South Korea"),
    ("lu", "Luxembourg"),
    ("ma", "Morocco"),
    ("mx", "Mexico"),
    ("nl", "Netherlands"),
    ("no", "Norway"),
    ("pl", "Poland"),
    ("pt", "Portugal"),
    ("ro", "Romania"),
    ("rs", "Serbia"),
    ("se", "Sweden"),
    ("si", "Slovenia"),
    ("sk", "Slovakia"),
    ("tn", "Tunisia"),
    ("tr", "Turkey"),
    ("ua", "Ukraine"),
    ("us", "United States"),
];

/// Case-insensitive alias table
#[derive(Debug, Clone)]
pub struct CountryNormalizer {
    aliases: HashMap<String, String>,
}

impl Default for CountryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CountryNormalizer {
    /// Normalizer with the built-in alias and country-code tables.
    #[must_use]
    pub fn new() -> Self {
        let aliases = ISO_CODES
            .iter()
            .chain(BUILTIN_ALIASES)
            .map(|(alias, canonical)| ((*alias).to_string(), (*canonical).to_string()))
            .collect();
        Self { aliases }
    }

    /// Add aliases on top of the built-ins; later entries win.
    #[must_use]
    pub fn with_aliases<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (alias, canonical) in extra {
            self.aliases
                .insert(collapse_whitespace(alias.as_ref()).to_lowercase(), canonical.into());
        }
        self
    }

    /// Canonical spelling for `text`, `None` if it is not a known alias.
    #[must_use]
    pub fn normalize(&self, text: &str) -> Option<&str> {
        let key = collapse_whitespace(text).to_lowercase();
        self.aliases.get(&key).map(String::as_str)
    }

    /// Canonical spelling, falling back to the input unchanged.
    #[must_use]
    pub fn canonical_or_original(&self, text: &str) -> String {
        self.normalize(text)
            .map_or_else(|| text.to_string(), str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_aliases_match_any_case() {
        let n = CountryNormalizer::new();
        assert_eq!(n.normalize("Deutschland"), Some("Germany"));
        assert_eq!(n.normalize("  CZECHIA "), Some("Czech Republic"));
    }

    #[test]
    fn country_codes_map_to_names() {
        let n = CountryNormalizer::new();
        assert_eq!(n.normalize("AT"), Some("Austria"));
        assert_eq!(n.normalize(" fr "), Some("France"));
        assert_eq!(n.canonical_or_original("GB"), "United Kingdom");
        assert_eq!(n.canonical_or_original("XX"), "XX");
    }

    #[test]
    fn unknown_text_is_not_an_error() {
        let n = CountryNormalizer::new();
        assert_eq!(n.normalize("France"), None);
        assert_eq!(n.canonical_or_original("France"), "France");
    }

    #[test]
    fn extra_aliases_extend_the_table() {
        let n = CountryNormalizer::new().with_aliases([("Türkiye", "Turkey")]);
        assert_eq!(n.normalize("türkiye"), Some("Turkey"));
        assert_eq!(n.normalize("deutschland"), Some("Germany"));
    }
}
