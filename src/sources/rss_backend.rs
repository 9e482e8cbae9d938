use chrono::{DateTime, Utc};
use futures::{future::BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::RssBackendConfig,
    domain::{Article, SourceKind},
    feed::query::QueryParams,
};

use super::{clean_text, parse_link, ArticleSource, FetchError};

/// Server-side RSS aggregation endpoint; filtering is decided by the server.
pub struct RssBackendSource {
    http: Client,
    config: RssBackendConfig,
}

impl RssBackendSource {
    pub fn new(http: Client, config: RssBackendConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_feed(&self) -> Result<Vec<Article>, FetchError> {
        let response = self.http.get(&self.config.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                endpoint: self.config.url.clone(),
            });
        }

        let body = response.bytes().await?;
        let articles = decode_articles(&body)?;
        tracing::debug!(
            target: "source",
            source = %SourceKind::RssBackend,
            count = articles.len(),
            "decoded provider payload"
        );
        Ok(articles)
    }
}

impl ArticleSource for RssBackendSource {
    fn kind(&self) -> SourceKind {
        SourceKind::RssBackend
    }

    fn fetch<'a>(&'a self, _params: &'a QueryParams) -> BoxFuture<'a, Result<Vec<Article>, FetchError>> {
        self.fetch_feed().boxed()
    }
}

#[derive(Debug, Deserialize)]
struct RssBackendResponse {
    articles: Vec<RssBackendArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RssBackendArticle {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    source: Option<String>,
    category: Option<String>,
    #[serde(rename = "imageURL")]
    image_url: Option<String>,
}

pub fn decode_articles(body: &[u8]) -> Result<Vec<Article>, FetchError> {
    let response: RssBackendResponse = serde_json::from_slice(body)?;
    Ok(response
        .articles
        .into_iter()
        .map(RssBackendArticle::into_article)
        .collect())
}

impl RssBackendArticle {
    fn into_article(self) -> Article {
        let id = clean_text(self.id).unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut article = Article::new(id, self.title);
        article.description = clean_text(self.description);
        article.image_url = parse_link(self.image_url.as_deref());
        article.url = parse_link(self.url.as_deref());
        article.source = clean_text(self.source);
        article.category = clean_text(self.category);
        article.published_at = self.published_at.as_deref().and_then(parse_feed_date);
        article
    }
}

/// RFC 822 style feed dates, e.g. `Tue, 02 Jan 2024 10:30:00 +0000`.
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn maps_entry_and_converts_offset_to_utc() {
        let body = br#"{"articles": [{
            "id": "feed-42",
            "title": "Rates hold steady",
            "url": "https://news.example.org/rates",
            "description": "Central bank pauses",
            "publishedAt": "Tue, 02 Jan 2024 12:30:00 +0200",
            "source": "example.org",
            "category": "business",
            "imageURL": "https://news.example.org/r.png",
            "feedId": "ignored"
        }]}"#;
        let articles = decode_articles(body).unwrap();
        let article = &articles[0];
        assert_eq!(article.id, "feed-42");
        assert_eq!(article.category.as_deref(), Some("business"));
        assert_eq!(
            article.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap())
        );
        assert!(article.content.is_none());
        assert!(article.ai_tags.is_empty());
        assert!(article.image_url.is_some());
    }

    #[test]
    fn tolerates_missing_fields() {
        let body = br#"{"articles": [{"url": "nope", "publishedAt": "2024-01-02"}]}"#;
        let articles = decode_articles(body).unwrap();
        let article = &articles[0];
        assert!(!article.id.is_empty());
        assert_eq!(article.title, crate::domain::article::UNTITLED);
        assert!(article.url.is_none());
        assert!(article.published_at.is_none());
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(decode_articles(br#"{"articles": []}"#).unwrap().is_empty());
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        assert!(matches!(
            decode_articles(b"<rss></rss>"),
            Err(FetchError::Decode(_))
        ));
    }
}
