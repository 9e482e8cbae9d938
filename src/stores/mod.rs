use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::db::BlobStore;

pub mod saved;
pub mod settings;
pub mod tag_weights;

pub use saved::SavedArticleStore;
pub use settings::SettingsStore;
pub use tag_weights::TagWeightStore;

/// In-memory value mirrored to one blob-store key.
///
/// Reads never touch the backing store. Writers are serialized and the
/// in-memory copy only changes after the write reached the store.
pub(crate) struct Persisted<T> {
    blobs: Arc<dyn BlobStore>,
    key: &'static str,
    value: RwLock<T>,
    writer: Mutex<()>,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + Sync,
{
    /// Missing or unreadable data falls back to `T::default()`.
    pub async fn load(blobs: Arc<dyn BlobStore>, key: &'static str) -> Self {
        let value = match blobs.load(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(target: "store", key, error = %err, "corrupt value; using default");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(err) => {
                tracing::warn!(target: "store", key, error = %err, "read failed; using default");
                T::default()
            }
        };
        Self {
            blobs,
            key,
            value: RwLock::new(value),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> T {
        self.value.read().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Applies `f` to a copy and persists it when it differs from the current value.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let _writer = self.writer.lock().await;
        let mut next = self.snapshot();
        let out = f(&mut next);

        let changed = {
            let current = self.value.read();
            next != *current
        };
        if changed {
            let raw = serde_json::to_string(&next)
                .with_context(|| format!("failed to encode {}", self.key))?;
            self.blobs
                .save(self.key, raw)
                .await
                .with_context(|| format!("failed to persist {}", self.key))?;
            *self.value.write() = next;
            tracing::debug!(target: "store", key = self.key, "value persisted");
        }
        Ok(out)
    }
}
