use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::types::SourceKind;

pub const MAX_LANGUAGES: usize = 5;
pub const MAX_COUNTRIES: usize = 5;

pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "he", "es", "fr", "de", "it"];
pub const SUPPORTED_COUNTRIES: &[&str] = &["us", "il", "gb", "ca", "au", "de"];

/// Categories understood by the keyword/category provider.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "top",
    "business",
    "entertainment",
    "environment",
    "food",
    "health",
    "politics",
    "science",
    "sports",
    "technology",
    "world",
];

pub fn is_known_category(tag: &str) -> bool {
    let lower = tag.to_lowercase();
    KNOWN_CATEGORIES.contains(&lower.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub enable_newsdata: bool,
    pub enable_rss: bool,
    pub languages: Vec<String>,
    pub countries: Vec<String>,
    pub show_images: bool,
    pub show_descriptions: bool,
    pub enable_tags: bool,
    pub enable_inline_view: bool,
    /// Domains such as `nytimes.com`; boost ranking and narrow quality mode.
    pub preferred_sources: Vec<String>,
    pub quality_mode: bool,
    pub confirm_unsave: bool,
    pub show_social_tab: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            enable_newsdata: true,
            enable_rss: true,
            languages: vec!["en".to_string()],
            countries: vec!["us".to_string()],
            show_images: true,
            show_descriptions: true,
            enable_tags: true,
            enable_inline_view: true,
            preferred_sources: Vec::new(),
            quality_mode: false,
            confirm_unsave: true,
            show_social_tab: true,
        }
    }
}

impl AppSettings {
    pub fn is_enabled(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Newsdata => self.enable_newsdata,
            SourceKind::RssBackend => self.enable_rss,
        }
    }

    pub fn preferred_domains(&self) -> Vec<String> {
        self.preferred_sources
            .iter()
            .map(|domain| domain.trim().to_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect()
    }

    pub fn preferred_domain_set(&self) -> HashSet<String> {
        self.preferred_domains().into_iter().collect()
    }
}
