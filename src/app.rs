use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures::FutureExt;
use reqwest::Client;
use tokio::time::timeout;
use tokio_cron_scheduler::JobScheduler;

use crate::{
    classifier::{ClassifierArtifact, TfIdfTagger},
    config::AppConfig,
    console::Console,
    db::{self, BlobStore, SqliteBlobStore},
    feed::{Aggregator, FeedService, RefreshGate},
    infrastructure::{clock::SystemClock, directories::ResolvedPaths, shutdown::Shutdown},
    sources::{ArticleSource, NewsdataSource, RssBackendSource},
    stores::{SavedArticleStore, SettingsStore, TagWeightStore},
    tasks::scheduler::{configure_refresh_job, RefreshCallback},
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NewsApp {
    _paths: ResolvedPaths,
    config: Arc<AppConfig>,
    feed: Arc<FeedService>,
    blobs: SqliteBlobStore,
    scheduler: Option<JobScheduler>,
    shutdown: Shutdown,
}

impl NewsApp {
    pub async fn initialize(config: AppConfig, paths: ResolvedPaths, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);

        let artifact = ClassifierArtifact::load(Path::new(&config.classifier.artifact_path))
            .with_context(|| {
                format!(
                    "failed to load classifier artifact {}",
                    config.classifier.artifact_path
                )
            })?;
        let classifier = Arc::new(TfIdfTagger::new(Arc::new(artifact)));

        let pool = db::init_pool(&paths.db_path).await?;
        let blobs = SqliteBlobStore::new(pool);
        let shared_blobs: Arc<dyn BlobStore> = Arc::new(blobs.clone());
        let settings = Arc::new(SettingsStore::load(shared_blobs.clone()).await);
        let tag_weights = Arc::new(TagWeightStore::load(shared_blobs.clone()).await);
        let saved = Arc::new(SavedArticleStore::load(shared_blobs).await);

        let http_client = Client::builder()
            .user_agent(format!("simple-news/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.http.timeout)
            .build()?;

        if config.newsdata.api_key.is_none() {
            tracing::warn!(
                target: "lifecycle",
                "NEWSDATA_API_KEY is not set; refreshes fail while newsdata is enabled"
            );
        }
        let sources: Vec<Arc<dyn ArticleSource>> = vec![
            Arc::new(NewsdataSource::new(http_client.clone(), config.newsdata.clone())),
            Arc::new(RssBackendSource::new(http_client, config.rss_backend.clone())),
        ];
        let aggregator = Aggregator::new(sources, classifier);

        let cooldown = chrono::Duration::from_std(config.refresh.cooldown)
            .context("refresh cooldown out of range")?;
        let gate = RefreshGate::new(Arc::new(SystemClock), cooldown);
        let feed = Arc::new(FeedService::new(aggregator, gate, settings, tag_weights, saved));

        let scheduler = match config.refresh.auto_refresh_cron.as_deref() {
            Some(spec) => Some(configure_refresh_job(spec, build_refresh_callback(feed.clone())).await?),
            None => {
                tracing::info!(target: "scheduler", "auto refresh disabled");
                None
            }
        };

        Ok(Self {
            _paths: paths,
            config,
            feed,
            blobs,
            scheduler,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let NewsApp {
            _paths: _,
            config,
            feed,
            blobs,
            scheduler,
            shutdown,
        } = self;

        tracing::info!(target: "lifecycle", version = env!("CARGO_PKG_VERSION"), "simple-news starting");

        // first load ignores the cooldown; a failure stays visible in the console
        if let Err(err) = feed.refresh(true).await {
            tracing::error!(target: "lifecycle", error = %err, "initial load failed");
        }

        let listener = shutdown.subscribe();
        let console = Console::new(feed.clone(), config.timezone);
        if let Err(err) = console.run(&shutdown, listener).await {
            tracing::error!(target: "console", error = %err, "console stopped with an error");
        }

        if let Some(mut scheduler) = scheduler {
            match timeout(SHUTDOWN_TIMEOUT, scheduler.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(target: "scheduler", ?err, "scheduler shutdown failed");
                }
                Err(_) => {
                    tracing::warn!(
                        target: "scheduler",
                        "scheduler did not stop within {:?}",
                        SHUTDOWN_TIMEOUT
                    );
                }
            }
        }

        if timeout(SHUTDOWN_TIMEOUT, blobs.close()).await.is_err() {
            tracing::warn!(
                target: "store",
                "blob store did not close within {:?}",
                SHUTDOWN_TIMEOUT
            );
        }

        tracing::info!(target: "lifecycle", "simple-news stopped");
        Ok(())
    }
}

fn build_refresh_callback(feed: Arc<FeedService>) -> RefreshCallback {
    Arc::new(move || {
        let feed = feed.clone();
        async move {
            if let Err(err) = feed.refresh(false).await {
                tracing::warn!(target: "scheduler", error = %err, "auto refresh failed");
            }
        }
        .boxed()
    })
}
