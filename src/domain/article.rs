use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::types::normalize_tag_key;

pub const UNTITLED: &str = "Untitled";

/// Number of AI tags shown next to the category chip.
const DISPLAY_AI_TAGS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<Url>,
    pub url: Option<Url>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub ai_tags: Vec<String>,
    pub is_saved: bool,
    pub liked: Option<bool>,
}

impl Article {
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        Self {
            id: id.into(),
            title,
            description: None,
            content: None,
            image_url: None,
            url: None,
            source: None,
            category: None,
            published_at: None,
            ai_tags: Vec::new(),
            is_saved: false,
            liked: None,
        }
    }

    pub fn host(&self) -> Option<String> {
        self.url
            .as_ref()
            .and_then(|url| url.host_str())
            .map(|host| host.to_lowercase())
    }

    /// Tag whose weight a like/dislike moves: the category, else the first AI tag.
    pub fn feedback_key(&self) -> Option<String> {
        self.category
            .as_deref()
            .and_then(normalize_tag_key)
            .or_else(|| self.ai_tags.first().and_then(|tag| normalize_tag_key(tag)))
    }

    /// Capitalized category chip followed by a few AI tags.
    pub fn display_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(category) = self.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                tags.push(capitalize_words(category));
            }
        }
        tags.extend(
            self.ai_tags
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty())
                .take(DISPLAY_AI_TAGS)
                .map(str::to_string),
        );
        tags
    }
}

/// Snapshot of an article kept after it leaves the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArticle {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<Url>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: Option<Url>,
}

impl SavedArticle {
    pub fn from_article(article: &Article) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: article.title.clone(),
            description: article.description.clone(),
            image_url: article.image_url.clone(),
            source: article.source.clone(),
            published_at: article.published_at,
            url: article.url.clone(),
        }
    }
}

fn capitalize_words(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
