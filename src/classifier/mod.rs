use thiserror::Error;

use crate::domain::Article;

pub mod artifact;
pub mod tagger;

pub use artifact::ClassifierArtifact;
pub use tagger::TfIdfTagger;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to read classifier artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse classifier artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("classifier artifact shape mismatch: {0}")]
    Shape(String),
    #[error("model produced a non-finite logit for tag {0}")]
    NonFinite(String),
}

/// Assigns topic tags to an article. Implementations never fail; they
/// degrade to an empty tag list instead.
pub trait Classifier: Send + Sync {
    fn classify(&self, article: &Article) -> Vec<String>;
}
