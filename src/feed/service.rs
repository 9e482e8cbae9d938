use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    domain::{AppSettings, Article},
    stores::{saved::SaveToggle, SavedArticleStore, SettingsStore, TagWeightStore},
};

use super::{
    aggregator::{AggregateError, Aggregator},
    ranking::rank,
    refresh::{RefreshGate, RefreshSkip},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { count: usize },
    Skipped(RefreshSkip),
}

/// What the user currently sees.
#[derive(Debug, Clone, Default)]
pub struct FeedView {
    pub articles: Vec<Article>,
    pub last_error: Option<String>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

pub struct FeedService {
    aggregator: Aggregator,
    gate: RefreshGate,
    settings: Arc<SettingsStore>,
    tag_weights: Arc<TagWeightStore>,
    saved: Arc<SavedArticleStore>,
    view: Mutex<FeedView>,
}

impl FeedService {
    pub fn new(
        aggregator: Aggregator,
        gate: RefreshGate,
        settings: Arc<SettingsStore>,
        tag_weights: Arc<TagWeightStore>,
        saved: Arc<SavedArticleStore>,
    ) -> Self {
        Self {
            aggregator,
            gate,
            settings,
            tag_weights,
            saved,
            view: Mutex::new(FeedView::default()),
        }
    }

    /// Fetches, ranks and publishes a new article list.
    ///
    /// On failure the previous list stays visible and the error message is
    /// kept in [`FeedView::last_error`].
    pub async fn refresh(&self, ignore_cooldown: bool) -> Result<RefreshOutcome, AggregateError> {
        let ticket = match self.gate.try_begin(ignore_cooldown) {
            Ok(ticket) => ticket,
            Err(skip) => {
                tracing::debug!(target: "feed", reason = %skip, "refresh skipped");
                return Ok(RefreshOutcome::Skipped(skip));
            }
        };

        let settings = self.settings.snapshot();
        let tag_weights = self.tag_weights.snapshot();

        match self.aggregator.fetch_articles(&settings, &tag_weights).await {
            Ok(articles) => {
                let mut ranked = rank(articles, &settings, &tag_weights);
                let saved_urls = self.saved.saved_urls();
                for article in &mut ranked {
                    article.is_saved = article
                        .url
                        .as_ref()
                        .is_some_and(|url| saved_urls.contains(url.as_str()));
                }

                let count = ranked.len();
                let mut view = self.view.lock();
                view.articles = ranked;
                view.last_error = None;
                view.last_refreshed = Some(ticket.complete());
                tracing::info!(target: "feed", count, ignore_cooldown, "feed refreshed");
                Ok(RefreshOutcome::Refreshed { count })
            }
            Err(err) => {
                drop(ticket);
                tracing::warn!(target: "feed", error = %err, "refresh failed; keeping previous articles");
                self.view.lock().last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn view(&self) -> FeedView {
        self.view.lock().clone()
    }

    pub fn article_at(&self, index: usize) -> Option<Article> {
        self.view.lock().articles.get(index).cloned()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn tag_weights(&self) -> &TagWeightStore {
        &self.tag_weights
    }

    pub fn saved(&self) -> &SavedArticleStore {
        &self.saved
    }

    /// Persists the change and, if anything changed, refreshes past the cooldown.
    pub async fn update_settings(&self, f: impl FnOnce(&mut AppSettings)) -> Result<bool> {
        let changed = self.settings.update(f).await?;
        if changed {
            // a failure is recorded in the view
            let _ = self.refresh(true).await;
        }
        Ok(changed)
    }

    pub async fn like(&self, id: &str) -> Result<Option<String>> {
        let article = self.find(id)?;
        let key = self.tag_weights.like(&article).await?;
        self.update_article(id, |a| a.liked = Some(true));
        Ok(key)
    }

    pub async fn dislike(&self, id: &str) -> Result<Option<String>> {
        let article = self.find(id)?;
        let key = self.tag_weights.dislike(&article).await?;
        self.update_article(id, |a| a.liked = Some(false));
        Ok(key)
    }

    pub async fn toggle_saved(&self, id: &str) -> Result<SaveToggle> {
        let article = self.find(id)?;
        let outcome = self.saved.toggle(&article).await?;
        if outcome != SaveToggle::NoUrl {
            self.sync_saved_flags();
        }
        Ok(outcome)
    }

    pub async fn remove_saved(&self, saved_id: &str) -> Result<bool> {
        let removed = self.saved.remove(saved_id).await?;
        if removed {
            self.sync_saved_flags();
        }
        Ok(removed)
    }

    fn find(&self, id: &str) -> Result<Article> {
        self.view
            .lock()
            .articles
            .iter()
            .find(|article| article.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("article {id} is no longer in the feed"))
    }

    fn update_article(&self, id: &str, f: impl FnOnce(&mut Article)) {
        let mut view = self.view.lock();
        if let Some(article) = view.articles.iter_mut().find(|article| article.id == id) {
            f(article);
        }
    }

    fn sync_saved_flags(&self) {
        for article in &mut self.view.lock().articles {
            article.is_saved = article
                .url
                .as_ref()
                .is_some_and(|url| self.saved.is_saved(url));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        db::testing::MemoryBlobStore,
        domain::SourceKind,
        feed::aggregator::tests::{article, FakeSource, TitleClassifier},
        infrastructure::clock::{testing::ManualClock, Clock},
        sources::ArticleSource,
    };

    struct Harness {
        clock: Arc<ManualClock>,
        newsdata: Arc<FakeSource>,
        service: FeedService,
    }

    async fn harness(newsdata_articles: Vec<Article>) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        ));
        let newsdata = FakeSource::ok(SourceKind::Newsdata, newsdata_articles);
        let rss = FakeSource::ok(SourceKind::RssBackend, Vec::new());
        let sources: Vec<Arc<dyn ArticleSource>> = vec![newsdata.clone(), rss];
        let aggregator = Aggregator::new(sources, Arc::new(TitleClassifier));

        let blobs = Arc::new(MemoryBlobStore::default());
        let service = FeedService::new(
            aggregator,
            RefreshGate::new(clock.clone(), Duration::minutes(10)),
            Arc::new(SettingsStore::load(blobs.clone()).await),
            Arc::new(TagWeightStore::load(blobs.clone()).await),
            Arc::new(SavedArticleStore::load(blobs).await),
        );
        Harness {
            clock,
            newsdata,
            service,
        }
    }

    fn dated(id: &str, day: u32, category: Option<&str>, url: &str) -> Article {
        let mut a = article(id, id, Some(url));
        a.published_at = Some(Utc.with_ymd_and_hms(2024, 4, day, 0, 0, 0).unwrap());
        a.category = category.map(str::to_string);
        a
    }

    #[tokio::test]
    async fn refresh_publishes_ranked_articles() {
        let h = harness(vec![
            dated("old", 1, None, "https://a.com/old"),
            dated("new", 2, None, "https://a.com/new"),
        ])
        .await;
        let outcome = h.service.refresh(true).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { count: 2 });

        let view = h.service.view();
        let ids: Vec<_> = view.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(view.last_refreshed, Some(h.clock.now()));
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn feedback_reaches_the_chosen_article_when_provider_ids_collide() {
        let h = harness(vec![
            dated("dup", 2, Some("sports"), "https://a.com/1"),
            dated("dup", 1, Some("technology"), "https://a.com/2"),
        ])
        .await;
        h.service.refresh(true).await.unwrap();

        let second = h.service.article_at(1).unwrap();
        assert_eq!(second.category.as_deref(), Some("technology"));
        let key = h.service.like(&second.id).await.unwrap();
        assert_eq!(key.as_deref(), Some("technology"));

        let liked: Vec<_> = h.service.view().articles.iter().map(|a| a.liked).collect();
        assert_eq!(liked, vec![None, Some(true)]);
        assert_eq!(h.service.tag_weights().weight("sports"), None);
    }

    #[tokio::test]
    async fn automatic_refresh_respects_cooldown() {
        let h = harness(vec![dated("a", 1, None, "https://a.com/1")]).await;
        h.service.refresh(true).await.unwrap();

        h.clock.advance(Duration::minutes(5));
        assert!(matches!(
            h.service.refresh(false).await.unwrap(),
            RefreshOutcome::Skipped(RefreshSkip::CoolingDown { .. })
        ));
        assert_eq!(h.newsdata.calls.load(Ordering::SeqCst), 1);

        h.clock.advance(Duration::minutes(5));
        h.service.refresh(false).await.unwrap();
        assert_eq!(h.newsdata.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_articles() {
        let h = harness(vec![dated("a", 1, None, "https://a.com/1")]).await;
        h.service.refresh(true).await.unwrap();

        h.newsdata.fail.store(true, Ordering::SeqCst);
        let err = h.service.refresh(true).await.unwrap_err();
        assert_eq!(err.kind, SourceKind::Newsdata);

        let view = h.service.view();
        assert_eq!(view.articles.len(), 1);
        assert!(view.last_error.unwrap().contains("newsdata"));

        // the failure did not start a cooldown window of its own
        h.newsdata.fail.store(false, Ordering::SeqCst);
        assert!(h.service.refresh(true).await.is_ok());
        assert!(h.service.view().last_error.is_none());
    }

    #[tokio::test]
    async fn like_learns_category_and_marks_article() {
        let h = harness(vec![dated("a", 1, Some("Technology"), "https://a.com/1")]).await;
        h.service.refresh(true).await.unwrap();

        let key = h.service.like("a").await.unwrap();
        assert_eq!(key.as_deref(), Some("technology"));
        assert_eq!(h.service.tag_weights().weight("technology"), Some(1.0));
        assert_eq!(h.service.article_at(0).unwrap().liked, Some(true));

        h.service.dislike("a").await.unwrap();
        assert_eq!(h.service.tag_weights().weight("technology"), Some(0.0));
        assert_eq!(h.service.article_at(0).unwrap().liked, Some(false));
    }

    #[tokio::test]
    async fn unknown_article_id_is_an_error() {
        let h = harness(Vec::new()).await;
        assert!(h.service.like("missing").await.is_err());
    }

    #[tokio::test]
    async fn saved_flags_follow_the_saved_store() {
        let h = harness(vec![dated("a", 1, None, "https://a.com/1")]).await;
        h.service.refresh(true).await.unwrap();

        assert_eq!(h.service.toggle_saved("a").await.unwrap(), SaveToggle::Saved);
        assert!(h.service.article_at(0).unwrap().is_saved);

        // a fresh fetch keeps the flag
        h.service.refresh(true).await.unwrap();
        assert!(h.service.article_at(0).unwrap().is_saved);

        let saved_id = h.service.saved().list()[0].id.clone();
        assert!(h.service.remove_saved(&saved_id).await.unwrap());
        assert!(!h.service.article_at(0).unwrap().is_saved);
    }

    #[tokio::test]
    async fn settings_change_refreshes_past_cooldown() {
        let h = harness(vec![dated("a", 1, None, "https://a.com/1")]).await;
        h.service.refresh(true).await.unwrap();

        assert!(h.service.update_settings(|s| s.quality_mode = true).await.unwrap());
        assert_eq!(h.newsdata.calls.load(Ordering::SeqCst), 2);

        assert!(!h.service.update_settings(|s| s.quality_mode = true).await.unwrap());
        assert_eq!(h.newsdata.calls.load(Ordering::SeqCst), 2);
    }
}
