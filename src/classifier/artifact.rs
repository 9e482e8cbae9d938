use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use super::ClassifierError;

/// Trained TF-IDF vocabulary plus a linear multi-label model.
///
/// The feature dimensionality is the length of `idf`; vocabulary indices may
/// point outside it and are skipped at inference time.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierArtifact {
    pub tags: Vec<String>,
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    pub model: LinearModel,
}

/// One weight row and one bias per tag.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<Vec<f64>>,
    #[serde(default)]
    pub bias: Vec<f64>,
}

impl ClassifierArtifact {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = fs::read_to_string(path)?;
        let artifact = Self::from_json(&raw)?;
        tracing::info!(
            target: "classifier",
            path = %path.display(),
            tags = artifact.tags.len(),
            vocabulary = artifact.vocabulary.len(),
            features = artifact.feature_count(),
            "classifier artifact loaded"
        );
        Ok(artifact)
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let mut artifact: ClassifierArtifact = serde_json::from_str(raw)?;
        if artifact.model.bias.is_empty() {
            artifact.model.bias = vec![0.0; artifact.tags.len()];
        }
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn feature_count(&self) -> usize {
        self.idf.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        let tags = self.tag_count();
        let features = self.feature_count();
        if self.model.weights.len() != tags {
            return Err(ClassifierError::Shape(format!(
                "{} weight rows for {} tags",
                self.model.weights.len(),
                tags
            )));
        }
        if self.model.bias.len() != tags {
            return Err(ClassifierError::Shape(format!(
                "{} bias terms for {} tags",
                self.model.bias.len(),
                tags
            )));
        }
        if let Some((row, weights)) = self
            .model
            .weights
            .iter()
            .enumerate()
            .find(|(_, weights)| weights.len() != features)
        {
            return Err(ClassifierError::Shape(format!(
                "weight row {} has {} columns, expected {}",
                row,
                weights.len(),
                features
            )));
        }
        Ok(())
    }
}

impl LinearModel {
    /// `features` must have the trained dimensionality.
    pub fn logits(&self, features: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                row.iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + bias
            })
            .collect()
    }
}
