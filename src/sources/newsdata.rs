use chrono::{DateTime, NaiveDateTime, Utc};
use futures::{future::BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::NewsdataConfig,
    domain::{Article, SourceKind},
    feed::query::QueryParams,
};

use super::{clean_text, parse_link, ArticleSource, FetchError};

const PUB_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keyword/category news API queried with the built parameters.
pub struct NewsdataSource {
    http: Client,
    config: NewsdataConfig,
}

impl NewsdataSource {
    pub fn new(http: Client, config: NewsdataConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_latest(&self, params: &QueryParams) -> Result<Vec<Article>, FetchError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingApiKey(SourceKind::Newsdata))?;

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[("apikey", api_key)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                endpoint: self.config.base_url.clone(),
            });
        }

        let body = response.bytes().await?;
        let articles = decode_articles(&body)?;
        tracing::debug!(
            target: "source",
            source = %SourceKind::Newsdata,
            count = articles.len(),
            "decoded provider payload"
        );
        Ok(articles)
    }
}

impl ArticleSource for NewsdataSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Newsdata
    }

    fn fetch<'a>(&'a self, params: &'a QueryParams) -> BoxFuture<'a, Result<Vec<Article>, FetchError>> {
        self.fetch_latest(params).boxed()
    }
}

#[derive(Debug, Deserialize)]
struct NewsdataResponse {
    results: Vec<NewsdataArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsdataArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    image_url: Option<String>,
    category: Option<Vec<String>>,
    source_id: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    link: Option<String>,
    tags: Option<Vec<String>>,
}

pub fn decode_articles(body: &[u8]) -> Result<Vec<Article>, FetchError> {
    let response: NewsdataResponse = serde_json::from_slice(body)?;
    Ok(response.results.into_iter().map(NewsdataArticle::into_article).collect())
}

impl NewsdataArticle {
    fn into_article(self) -> Article {
        let mut article = Article::new(Uuid::new_v4().to_string(), self.title);
        article.description = clean_text(self.description);
        article.content = clean_text(self.content);
        article.image_url = parse_link(self.image_url.as_deref());
        article.url = parse_link(self.link.as_deref());
        article.source = clean_text(self.source_id);
        article.category = self
            .category
            .and_then(|categories| categories.into_iter().next())
            .and_then(|c| clean_text(Some(c)));
        article.published_at = self.pub_date.as_deref().and_then(parse_pub_date);
        article.ai_tags = self.tags.unwrap_or_default();
        article
    }
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), PUB_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn maps_full_entry() {
        let body = br#"{
            "status": "success",
            "results": [{
                "title": "Chips get faster",
                "description": "A new fab opens",
                "content": "ONLY AVAILABLE IN PAID PLANS",
                "image_url": "https://img.example.com/1.jpg",
                "category": ["technology", "business"],
                "source_id": "example",
                "pubDate": "2024-01-02 10:30:00",
                "link": "https://example.com/chips",
                "tags": ["semiconductors"]
            }]
        }"#;
        let articles = decode_articles(body).unwrap();
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "Chips get faster");
        assert_eq!(article.category.as_deref(), Some("technology"));
        assert_eq!(article.source.as_deref(), Some("example"));
        assert_eq!(
            article.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap())
        );
        assert_eq!(article.url.as_ref().map(|u| u.as_str()), Some("https://example.com/chips"));
        assert_eq!(article.ai_tags, vec!["semiconductors"]);
        assert!(!article.id.is_empty());
    }

    #[test]
    fn tolerates_nulls_bad_links_and_bad_dates() {
        let body = br#"{"results": [{
            "title": null,
            "link": "::::",
            "image_url": "",
            "pubDate": "yesterday",
            "category": null
        }]}"#;
        let articles = decode_articles(body).unwrap();
        let article = &articles[0];
        assert_eq!(article.title, crate::domain::article::UNTITLED);
        assert!(article.url.is_none());
        assert!(article.image_url.is_none());
        assert!(article.published_at.is_none());
        assert!(article.category.is_none());
        assert!(article.ai_tags.is_empty());
    }

    #[test]
    fn empty_results_is_a_valid_empty_success() {
        assert!(decode_articles(br#"{"results": []}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_envelope_is_a_decode_error() {
        let err = decode_articles(br#"{"status": "error"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn generated_ids_are_unique() {
        let body = br#"{"results": [{"title": "a"}, {"title": "b"}]}"#;
        let articles = decode_articles(body).unwrap();
        assert_ne!(articles[0].id, articles[1].id);
    }
}
