use std::collections::BTreeMap;

use crate::domain::{
    settings::{is_known_category, MAX_COUNTRIES, MAX_LANGUAGES},
    AppSettings, TagWeights,
};

pub type QueryParams = BTreeMap<String, String>;

pub const PARAM_LANGUAGE: &str = "language";
pub const PARAM_COUNTRY: &str = "country";
pub const PARAM_CATEGORY: &str = "category";
pub const PARAM_TITLE_QUERY: &str = "qInTitle";
pub const PARAM_REMOVE_DUPLICATE: &str = "removeduplicate";
pub const PARAM_DOMAIN: &str = "domain";
pub const PARAM_PRIORITY_DOMAIN: &str = "prioritydomain";

/// Tags must weigh more than this to become provider filters.
const INTEREST_THRESHOLD: f64 = 0.5;
const MAX_CATEGORIES: usize = 5;

/// Outlets used by quality mode when the user has no preferred sources.
const FALLBACK_DOMAINS: [&str; 5] = [
    "bbc.com",
    "nytimes.com",
    "reuters.com",
    "apnews.com",
    "cnn.com",
];

pub fn build_params(settings: &AppSettings, tag_weights: &TagWeights) -> QueryParams {
    let mut params = QueryParams::new();

    if let Some(languages) = join_codes(&settings.languages, MAX_LANGUAGES) {
        params.insert(PARAM_LANGUAGE.to_string(), languages);
    }
    if let Some(countries) = join_codes(&settings.countries, MAX_COUNTRIES) {
        params.insert(PARAM_COUNTRY.to_string(), countries);
    }

    let mut interests: Vec<(&String, f64)> = tag_weights
        .iter()
        .filter(|(_, weight)| **weight > INTEREST_THRESHOLD)
        .map(|(tag, weight)| (tag, *weight))
        .collect();
    // stable: equal weights keep the map's alphabetical order
    interests.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let (categories, keywords): (Vec<_>, Vec<_>) = interests
        .into_iter()
        .map(|(tag, _)| tag)
        .partition(|tag| is_known_category(tag));

    if !categories.is_empty() {
        let joined = categories
            .iter()
            .take(MAX_CATEGORIES)
            .map(|tag| tag.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        params.insert(PARAM_CATEGORY.to_string(), joined);
    }
    if !keywords.is_empty() {
        let joined = keywords
            .iter()
            .map(|tag| tag.as_str())
            .collect::<Vec<_>>()
            .join(" OR ");
        params.insert(PARAM_TITLE_QUERY.to_string(), joined);
    }

    params.insert(PARAM_REMOVE_DUPLICATE.to_string(), "1".to_string());

    if settings.quality_mode {
        let preferred = settings.preferred_domains();
        let domains = if preferred.is_empty() {
            FALLBACK_DOMAINS.iter().map(|d| d.to_string()).collect()
        } else {
            preferred
        };
        params.insert(PARAM_DOMAIN.to_string(), domains.join(","));
        params.insert(PARAM_PRIORITY_DOMAIN.to_string(), "top".to_string());
    }

    params
}

fn join_codes(codes: &[String], limit: usize) -> Option<String> {
    let picked: Vec<&str> = codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .take(limit)
        .collect();
    if picked.is_empty() {
        None
    } else {
        Some(picked.join(","))
    }
}
