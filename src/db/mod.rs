use std::{path::Path, str::FromStr, time::Duration};

use anyhow::Result;
use futures::{future::BoxFuture, FutureExt};
use sqlx::{
    query, query_scalar,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

pub const SETTINGS_KEY: &str = "appSettings";
pub const TAG_WEIGHTS_KEY: &str = "tagWeights";
pub const SAVED_ARTICLES_KEY: &str = "savedArticles";

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    query(
        r#"
        CREATE TABLE IF NOT EXISTS blobs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await?;

    tracing::info!(target: "store", path = %db_path.display(), "blob store ready");
    Ok(pool)
}

/// Opaque key -> serialized value persistence.
pub trait BlobStore: Send + Sync {
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
    fn save<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone)]
pub struct SqliteBlobStore {
    pool: SqlitePool,
}

impl SqliteBlobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_value(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = query_scalar(r#"SELECT value FROM blobs WHERE key = ?1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn save_value(&self, key: &str, value: String) -> Result<()> {
        query(
            r#"INSERT OR REPLACE INTO blobs (key, value, updated_at)
                VALUES (?1, ?2, CURRENT_TIMESTAMP)"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl BlobStore for SqliteBlobStore {
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        self.load_value(key).boxed()
    }

    fn save<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
        self.save_value(key, value).boxed()
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;

    use anyhow::{anyhow, Result};
    use futures::{future, future::BoxFuture, FutureExt};
    use parking_lot::Mutex;

    use super::BlobStore;

    /// In-memory store; `fail_writes` makes every save error.
    #[derive(Default)]
    pub struct MemoryBlobStore {
        pub values: Mutex<HashMap<String, String>>,
        pub writes: Mutex<usize>,
        pub fail_writes: bool,
    }

    impl MemoryBlobStore {
        pub fn with_value(key: &str, value: &str) -> Self {
            let store = Self::default();
            store.values.lock().insert(key.to_string(), value.to_string());
            store
        }

        pub fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub fn get(&self, key: &str) -> Option<String> {
            self.values.lock().get(key).cloned()
        }

        pub fn write_count(&self) -> usize {
            *self.writes.lock()
        }
    }

    impl BlobStore for MemoryBlobStore {
        fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
            future::ready(Ok(self.get(key))).boxed()
        }

        fn save<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
            let result = if self.fail_writes {
                Err(anyhow!("disk full"))
            } else {
                *self.writes.lock() += 1;
                self.values.lock().insert(key.to_string(), value);
                Ok(())
            };
            future::ready(result).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_replaces_and_loads_values() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("blobs.db")).await.unwrap();
        let store = SqliteBlobStore::new(pool);

        assert_eq!(store.load(TAG_WEIGHTS_KEY).await.unwrap(), None);
        store.save(TAG_WEIGHTS_KEY, "{\"a\":1.0}".into()).await.unwrap();
        store.save(TAG_WEIGHTS_KEY, "{\"b\":2.0}".into()).await.unwrap();
        assert_eq!(
            store.load(TAG_WEIGHTS_KEY).await.unwrap().as_deref(),
            Some("{\"b\":2.0}")
        );
        store.close().await;
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobs.db");
        {
            let store = SqliteBlobStore::new(init_pool(&path).await.unwrap());
            store.save(SETTINGS_KEY, "{}".into()).await.unwrap();
            store.close().await;
        }
        let store = SqliteBlobStore::new(init_pool(&path).await.unwrap());
        assert_eq!(store.load(SETTINGS_KEY).await.unwrap().as_deref(), Some("{}"));
    }
}
