use std::{collections::HashSet, sync::Arc};

use futures::{
    future::{self, try_join_all},
    FutureExt,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    classifier::Classifier,
    domain::{AppSettings, Article, SourceKind, TagWeights},
    sources::{ArticleSource, FetchError},
};

use super::query::build_params;

#[derive(Debug, Error)]
#[error("{kind} source failed: {error}")]
pub struct AggregateError {
    pub kind: SourceKind,
    #[source]
    pub error: FetchError,
}

/// Fans out to every enabled source, merges, dedups and tags the result.
pub struct Aggregator {
    sources: Vec<Arc<dyn ArticleSource>>,
    classifier: Arc<dyn Classifier>,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn ArticleSource>>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            sources,
            classifier,
        }
    }

    pub async fn fetch_articles(
        &self,
        settings: &AppSettings,
        tag_weights: &TagWeights,
    ) -> Result<Vec<Article>, AggregateError> {
        let params = build_params(settings, tag_weights);

        let calls = self.sources.iter().map(|source| {
            let kind = source.kind();
            if !settings.is_enabled(kind) {
                tracing::debug!(target: "feed", source = %kind, "source disabled; skipping");
                return future::ready(Ok::<_, AggregateError>(Vec::new())).boxed();
            }
            source
                .fetch(&params)
                .map(move |result| result.map_err(|error| AggregateError { kind, error }))
                .boxed()
        });
        let batches = try_join_all(calls).await?;

        let fetched: usize = batches.iter().map(Vec::len).sum();
        let mut merged = dedup_by_url(batches.into_iter().flatten());
        ensure_unique_ids(&mut merged);
        tracing::info!(
            target: "feed",
            fetched,
            unique = merged.len(),
            "merged source results"
        );

        Ok(self.tag_articles(merged))
    }

    fn tag_articles(&self, mut articles: Vec<Article>) -> Vec<Article> {
        for article in &mut articles {
            article.ai_tags = self.classifier.classify(article);
        }
        articles
    }
}

/// Keeps the first article seen for each URL; URL-less articles always stay.
pub fn dedup_by_url(articles: impl IntoIterator<Item = Article>) -> Vec<Article> {
    let mut seen: HashSet<String> = HashSet::new();
    articles
        .into_iter()
        .filter(|article| match &article.url {
            Some(url) => seen.insert(url.as_str().to_string()),
            None => true,
        })
        .collect()
}

/// Re-mints the id of any article whose id was already taken earlier in the batch.
/// Feedback looks articles up by id, so two entries sharing one would alias.
pub fn ensure_unique_ids(articles: &mut [Article]) {
    let mut seen: HashSet<String> = HashSet::with_capacity(articles.len());
    for article in articles.iter_mut() {
        if seen.insert(article.id.clone()) {
            continue;
        }
        let fresh = Uuid::new_v4().to_string();
        tracing::debug!(
            target: "feed",
            duplicate = %article.id,
            id = %fresh,
            "duplicate article id; assigned a new one"
        );
        article.id = fresh;
        seen.insert(article.id.clone());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };

    use futures::future::BoxFuture;
    use reqwest::StatusCode;
    use tokio::sync::Barrier;
    use url::Url;

    use super::*;
    use crate::feed::query::QueryParams;

    pub(crate) struct FakeSource {
        pub kind: SourceKind,
        pub articles: Vec<Article>,
        pub fail: AtomicBool,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn ok(kind: SourceKind, articles: Vec<Article>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                articles,
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(kind: SourceKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                articles: Vec::new(),
                fail: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ArticleSource for FakeSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn fetch<'a>(
            &'a self,
            _params: &'a QueryParams,
        ) -> BoxFuture<'a, Result<Vec<Article>, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail.load(Ordering::SeqCst) {
                Err(FetchError::Status {
                    status: StatusCode::BAD_GATEWAY,
                    endpoint: "fake".to_string(),
                })
            } else {
                Ok(self.articles.clone())
            };
            future::ready(result).boxed()
        }
    }

    /// Only resolves once every source sharing the barrier is being polled.
    struct RendezvousSource {
        kind: SourceKind,
        barrier: Arc<Barrier>,
    }

    impl ArticleSource for RendezvousSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn fetch<'a>(
            &'a self,
            _params: &'a QueryParams,
        ) -> BoxFuture<'a, Result<Vec<Article>, FetchError>> {
            let barrier = self.barrier.clone();
            let id = format!("{}-1", self.kind);
            async move {
                barrier.wait().await;
                Ok(vec![article(&id, "joined", None)])
            }
            .boxed()
        }
    }

    /// Tags every article with its lowercased title.
    pub(crate) struct TitleClassifier;

    impl Classifier for TitleClassifier {
        fn classify(&self, article: &Article) -> Vec<String> {
            vec![article.title.to_lowercase()]
        }
    }

    pub(crate) fn article(id: &str, title: &str, url: Option<&str>) -> Article {
        let mut article = Article::new(id, Some(title.to_string()));
        article.url = url.and_then(|u| Url::parse(u).ok());
        article
    }

    fn aggregator(sources: Vec<Arc<FakeSource>>) -> Aggregator {
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn ArticleSource>)
            .collect();
        Aggregator::new(sources, Arc::new(TitleClassifier))
    }

    #[tokio::test]
    async fn same_url_across_sources_is_kept_once() {
        let newsdata = FakeSource::ok(
            SourceKind::Newsdata,
            vec![article("n1", "X", Some("https://a.com/1"))],
        );
        let rss = FakeSource::ok(
            SourceKind::RssBackend,
            vec![article("r1", "X-dup", Some("https://a.com/1"))],
        );
        let merged = aggregator(vec![newsdata, rss])
            .fetch_articles(&AppSettings::default(), &TagWeights::new())
            .await
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "n1");
    }

    #[test]
    fn dedup_keeps_first_and_all_url_less_articles() {
        let merged = dedup_by_url(vec![
            article("1", "a", Some("https://a.com/x")),
            article("2", "b", None),
            article("3", "c", Some("https://a.com/x")),
            article("4", "d", None),
            article("5", "e", Some("https://a.com/y")),
        ]);
        let ids: Vec<_> = merged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4", "5"]);
    }

    #[tokio::test]
    async fn disabled_source_is_never_called() {
        let newsdata = FakeSource::ok(SourceKind::Newsdata, vec![article("n1", "A", None)]);
        let rss = FakeSource::ok(SourceKind::RssBackend, vec![article("r1", "B", None)]);
        let settings = AppSettings {
            enable_rss: false,
            ..AppSettings::default()
        };
        let merged = aggregator(vec![newsdata.clone(), rss.clone()])
            .fetch_articles(&settings, &TagWeights::new())
            .await
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(rss.calls.load(Ordering::SeqCst), 0);
        assert_eq!(newsdata.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_failing_source_fails_the_whole_fetch() {
        let newsdata = FakeSource::ok(SourceKind::Newsdata, vec![article("n1", "A", None)]);
        let rss = FakeSource::failing(SourceKind::RssBackend);
        let err = aggregator(vec![newsdata, rss])
            .fetch_articles(&AppSettings::default(), &TagWeights::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, SourceKind::RssBackend);
    }

    #[tokio::test]
    async fn merged_articles_are_tagged_by_classifier() {
        let mut provided = article("n1", "Markets", None);
        provided.ai_tags = vec!["provider-tag".to_string()];
        let newsdata = FakeSource::ok(SourceKind::Newsdata, vec![provided]);
        let merged = aggregator(vec![newsdata])
            .fetch_articles(&AppSettings::default(), &TagWeights::new())
            .await
            .unwrap();
        assert_eq!(merged[0].ai_tags, vec!["markets"]);
    }

    #[tokio::test]
    async fn duplicate_provider_ids_are_made_unique() {
        let rss = FakeSource::ok(
            SourceKind::RssBackend,
            vec![
                article("dup", "Match report", Some("https://a.com/1")),
                article("dup", "Chip news", Some("https://a.com/2")),
            ],
        );
        let newsdata = FakeSource::ok(
            SourceKind::Newsdata,
            vec![article("dup", "Weather", None)],
        );
        let merged = aggregator(vec![newsdata, rss])
            .fetch_articles(&AppSettings::default(), &TagWeights::new())
            .await
            .unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, "dup");
        let ids: HashSet<&str> = merged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        let titles: Vec<&str> = merged.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Weather", "Match report", "Chip news"]);
    }

    #[test]
    fn distinct_ids_are_left_alone() {
        let mut articles = vec![article("a", "A", None), article("b", "B", None)];
        ensure_unique_ids(&mut articles);
        let ids: Vec<_> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn enabled_sources_are_fetched_concurrently() {
        let barrier = Arc::new(Barrier::new(2));
        let sources: Vec<Arc<dyn ArticleSource>> = vec![
            Arc::new(RendezvousSource {
                kind: SourceKind::Newsdata,
                barrier: barrier.clone(),
            }),
            Arc::new(RendezvousSource {
                kind: SourceKind::RssBackend,
                barrier,
            }),
        ];
        let aggregator = Aggregator::new(sources, Arc::new(TitleClassifier));
        let merged = tokio::time::timeout(
            Duration::from_secs(2),
            aggregator.fetch_articles(&AppSettings::default(), &TagWeights::new()),
        )
        .await
        .expect("sources were fetched one after another")
        .unwrap();
        assert_eq!(merged.len(), 2);
    }
}
