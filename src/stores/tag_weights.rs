use std::sync::Arc;

use anyhow::Result;

use crate::{
    db::{BlobStore, TAG_WEIGHTS_KEY},
    domain::{types::normalize_tag_key, Article, TagWeights},
};

use super::Persisted;

pub const FEEDBACK_DELTA: f64 = 1.0;
pub const NEW_TAG_WEIGHT: f64 = 1.0;

/// Learned tag preferences. Every change is persisted before returning.
pub struct TagWeightStore {
    inner: Persisted<TagWeights>,
}

impl TagWeightStore {
    pub async fn load(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            inner: Persisted::load(blobs, TAG_WEIGHTS_KEY).await,
        }
    }

    pub fn snapshot(&self) -> TagWeights {
        self.inner.snapshot()
    }

    pub fn weight(&self, tag: &str) -> Option<f64> {
        let key = normalize_tag_key(tag)?;
        self.inner.read(|weights| weights.get(&key).copied())
    }

    /// Returns the tag key that moved, if the article had one.
    pub async fn like(&self, article: &Article) -> Result<Option<String>> {
        self.apply_feedback(article, FEEDBACK_DELTA).await
    }

    pub async fn dislike(&self, article: &Article) -> Result<Option<String>> {
        self.apply_feedback(article, -FEEDBACK_DELTA).await
    }

    async fn apply_feedback(&self, article: &Article, delta: f64) -> Result<Option<String>> {
        let Some(key) = article.feedback_key() else {
            tracing::debug!(target: "store", article = %article.id, "no tag to learn from");
            return Ok(None);
        };
        self.inner
            .mutate(|weights| *weights.entry(key.clone()).or_insert(0.0) += delta)
            .await?;
        tracing::info!(target: "store", tag = %key, delta, "tag weight updated");
        Ok(Some(key))
    }

    /// Starts a tag at 1.0; existing weights are left alone.
    pub async fn add_tag(&self, name: &str) -> Result<bool> {
        let Some(key) = normalize_tag_key(name) else {
            return Ok(false);
        };
        self.inner
            .mutate(|weights| {
                if weights.contains_key(&key) {
                    false
                } else {
                    weights.insert(key, NEW_TAG_WEIGHT);
                    true
                }
            })
            .await
    }

    pub async fn remove_tag(&self, name: &str) -> Result<bool> {
        let Some(key) = normalize_tag_key(name) else {
            return Ok(false);
        };
        self.inner.mutate(|weights| weights.remove(&key).is_some()).await
    }

    /// Overwrites without clamping.
    pub async fn set_weight(&self, name: &str, value: f64) -> Result<bool> {
        let Some(key) = normalize_tag_key(name) else {
            return Ok(false);
        };
        self.inner
            .mutate(|weights| {
                weights.insert(key, value);
                true
            })
            .await
    }
}
