use futures::future::BoxFuture;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::{
    domain::{Article, SourceKind},
    feed::query::QueryParams,
};

pub mod newsdata;
pub mod rss_backend;

pub use newsdata::NewsdataSource;
pub use rss_backend::RssBackendSource;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no API key configured for {0}")]
    MissingApiKey(SourceKind),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} answered with status {status}")]
    Status { status: StatusCode, endpoint: String },
    #[error("response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A content provider that yields normalized articles.
pub trait ArticleSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Providers that filter server-side ignore `params`.
    fn fetch<'a>(&'a self, params: &'a QueryParams) -> BoxFuture<'a, Result<Vec<Article>, FetchError>>;
}

/// Blank or unparsable links become an absent URL instead of a decode failure.
pub(crate) fn parse_link(raw: Option<&str>) -> Option<Url> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Url::parse(raw).ok()
}

pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
