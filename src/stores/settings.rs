use std::sync::Arc;

use anyhow::Result;

use crate::{
    db::{BlobStore, SETTINGS_KEY},
    domain::AppSettings,
};

use super::Persisted;

pub struct SettingsStore {
    inner: Persisted<AppSettings>,
}

impl SettingsStore {
    pub async fn load(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            inner: Persisted::load(blobs, SETTINGS_KEY).await,
        }
    }

    /// Consistent copy for one fetch cycle.
    pub fn snapshot(&self) -> AppSettings {
        self.inner.snapshot()
    }

    /// Returns whether anything changed.
    pub async fn update(&self, f: impl FnOnce(&mut AppSettings)) -> Result<bool> {
        self.inner
            .mutate(|settings| {
                let before = settings.clone();
                f(settings);
                *settings != before
            })
            .await
    }
}
