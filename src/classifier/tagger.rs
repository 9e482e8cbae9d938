use std::{collections::BTreeMap, sync::Arc};

use crate::domain::Article;

use super::{Classifier, ClassifierArtifact, ClassifierError};

pub const MAX_TAGS: usize = 5;
pub const PROBABILITY_THRESHOLD: f64 = 0.2;
/// Tokens need at least this many characters.
const MIN_TOKEN_CHARS: usize = 3;

/// TF-IDF features fed through the artifact's linear model.
#[derive(Clone)]
pub struct TfIdfTagger {
    artifact: Arc<ClassifierArtifact>,
}

impl TfIdfTagger {
    pub fn new(artifact: Arc<ClassifierArtifact>) -> Self {
        Self { artifact }
    }

    pub fn predict(&self, text: &str) -> Result<Vec<String>, ClassifierError> {
        let tokens = tokenize(text);
        let counts = self.term_counts(&tokens);
        if counts.is_empty() {
            tracing::debug!(
                target: "classifier",
                tokens = tokens.len(),
                "no vocabulary hits; skipping model"
            );
            return Ok(Vec::new());
        }

        let features = self.vectorize(&counts, tokens.len());
        let logits = self.artifact.model.logits(&features);
        if logits.len() != self.artifact.tag_count() {
            return Err(ClassifierError::Shape(format!(
                "model returned {} logits for {} tags",
                logits.len(),
                self.artifact.tag_count()
            )));
        }

        let mut scored = Vec::with_capacity(logits.len());
        for (tag, logit) in self.artifact.tags.iter().zip(logits) {
            if !logit.is_finite() {
                return Err(ClassifierError::NonFinite(tag.clone()));
            }
            scored.push((tag.as_str(), sigmoid(logit)));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let selected = scored
            .into_iter()
            .take(MAX_TAGS)
            .filter(|(_, probability)| *probability >= PROBABILITY_THRESHOLD)
            .map(|(tag, _)| tag);
        Ok(normalize_tags(selected))
    }

    /// Feature index -> occurrence count, for tokens in the vocabulary.
    fn term_counts(&self, tokens: &[String]) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for token in tokens {
            if let Some(&index) = self.artifact.vocabulary.get(token) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }
        counts
    }

    fn vectorize(&self, counts: &BTreeMap<usize, usize>, total_tokens: usize) -> Vec<f64> {
        let idf = &self.artifact.idf;
        let mut features = vec![0.0; self.artifact.feature_count()];
        for (&index, &count) in counts {
            // vocabulary and model may disagree after retraining
            if index >= features.len() || index >= idf.len() {
                continue;
            }
            let tf = count as f64 / total_tokens as f64;
            features[index] = tf * idf[index];
        }
        features
    }
}

impl Classifier for TfIdfTagger {
    fn classify(&self, article: &Article) -> Vec<String> {
        let text = input_text(article);
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.predict(&text) {
            Ok(tags) => tags,
            Err(err) => {
                tracing::warn!(
                    target: "classifier",
                    error = %err,
                    article = %article.id,
                    "classification failed; leaving article untagged"
                );
                Vec::new()
            }
        }
    }
}

/// Title, description and content separated by blank lines.
pub fn input_text(article: &Article) -> String {
    let mut parts = vec![article.title.as_str()];
    if let Some(description) = article.description.as_deref() {
        parts.push(description);
    }
    if let Some(content) = article.content.as_deref() {
        parts.push(content);
    }
    parts.join("\n\n")
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Trimmed, lowercased, deduplicated; first occurrence keeps its rank.
fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
