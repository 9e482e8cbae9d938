use std::{cmp::Ordering, collections::HashSet, sync::Arc};

use anyhow::Result;
use url::Url;

use crate::{
    db::{BlobStore, SAVED_ARTICLES_KEY},
    domain::{Article, SavedArticle},
};

use super::Persisted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveToggle {
    Saved,
    Removed,
    /// Articles without a URL cannot be saved.
    NoUrl,
}

/// Bookmarked articles, keyed by URL.
pub struct SavedArticleStore {
    inner: Persisted<Vec<SavedArticle>>,
}

impl SavedArticleStore {
    pub async fn load(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            inner: Persisted::load(blobs, SAVED_ARTICLES_KEY).await,
        }
    }

    pub async fn toggle(&self, article: &Article) -> Result<SaveToggle> {
        let Some(url) = article.url.clone() else {
            return Ok(SaveToggle::NoUrl);
        };
        let outcome = self
            .inner
            .mutate(|saved| {
                let before = saved.len();
                saved.retain(|entry| entry.url.as_ref() != Some(&url));
                if saved.len() == before {
                    saved.push(SavedArticle::from_article(article));
                    SaveToggle::Saved
                } else {
                    SaveToggle::Removed
                }
            })
            .await?;
        tracing::info!(target: "store", url = %url, outcome = ?outcome, "saved articles toggled");
        Ok(outcome)
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.inner
            .mutate(|saved| {
                let before = saved.len();
                saved.retain(|entry| entry.id != id);
                saved.len() != before
            })
            .await
    }

    /// Newest first, undated last, ties by title.
    pub fn list(&self) -> Vec<SavedArticle> {
        let mut saved = self.inner.snapshot();
        saved.sort_by(compare_saved);
        saved
    }

    pub fn is_saved(&self, url: &Url) -> bool {
        self.inner
            .read(|saved| saved.iter().any(|entry| entry.url.as_ref() == Some(url)))
    }

    pub fn saved_urls(&self) -> HashSet<String> {
        self.inner.read(|saved| {
            saved
                .iter()
                .filter_map(|entry| entry.url.as_ref().map(|url| url.as_str().to_string()))
                .collect()
        })
    }
}

fn compare_saved(a: &SavedArticle, b: &SavedArticle) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.title.cmp(&b.title))
}
