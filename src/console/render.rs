use std::fmt::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    domain::{AppSettings, Article, SavedArticle, TagWeights},
    feed::service::FeedView,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M %Z";
const DESCRIPTION_PREVIEW_CHARS: usize = 140;

pub const HELP: &str = "\
commands:
  list | refresh | show N | like N | dislike N | save N
  saved | unsave N [--yes]
  tags | tag add NAME | tag rm NAME | tag set NAME VALUE
  settings | set languages|countries|sources LIST | set quality|newsdata|rss on|off
  help | quit";

pub fn timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string()
}

pub fn feed(view: &FeedView, settings: &AppSettings, tz: Tz) -> String {
    let mut out = String::new();
    if view.articles.is_empty() {
        out.push_str("no articles yet\n");
    }
    for (n, article) in view.articles.iter().enumerate() {
        let _ = writeln!(out, "{}", headline(n + 1, article, settings, tz));
        if settings.show_descriptions {
            if let Some(description) = article.description.as_deref() {
                let _ = writeln!(out, "      {}", preview(description));
            }
        }
    }
    if let Some(at) = view.last_refreshed {
        let _ = writeln!(out, "updated {}", timestamp(at, tz));
    }
    if let Some(error) = view.last_error.as_deref() {
        let _ = writeln!(out, "last refresh failed: {error} (type `refresh` to retry)");
    }
    out.trim_end().to_string()
}

fn headline(n: usize, article: &Article, settings: &AppSettings, tz: Tz) -> String {
    let marker = match (article.is_saved, article.liked) {
        (true, _) => '*',
        (false, Some(true)) => '+',
        (false, Some(false)) => '-',
        (false, None) => ' ',
    };
    let mut line = format!("{n:>3}.{marker} {}", article.title);
    let mut meta = Vec::new();
    if let Some(source) = article.source.as_deref().or(article.url.as_ref().and_then(|u| u.host_str())) {
        meta.push(source.to_string());
    }
    if let Some(at) = article.published_at {
        meta.push(timestamp(at, tz));
    }
    if settings.enable_tags {
        let tags = article.display_tags();
        if !tags.is_empty() {
            meta.push(tags.join(", "));
        }
    }
    if !meta.is_empty() {
        let _ = write!(line, "  ({})", meta.join(" | "));
    }
    line
}

pub fn article(article: &Article, settings: &AppSettings, tz: Tz) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", article.title);
    if let Some(source) = article.source.as_deref() {
        let _ = writeln!(out, "source:    {source}");
    }
    if let Some(at) = article.published_at {
        let _ = writeln!(out, "published: {}", timestamp(at, tz));
    }
    if let Some(url) = &article.url {
        let _ = writeln!(out, "link:      {url}");
    }
    if settings.show_images {
        if let Some(image) = &article.image_url {
            let _ = writeln!(out, "image:     {image}");
        }
    }
    if settings.enable_tags && !article.display_tags().is_empty() {
        let _ = writeln!(out, "tags:      {}", article.display_tags().join(", "));
    }
    if settings.show_descriptions {
        if let Some(description) = article.description.as_deref() {
            let _ = writeln!(out, "\n{description}");
        }
    }
    if settings.enable_inline_view {
        if let Some(content) = article.content.as_deref() {
            let _ = writeln!(out, "\n{content}");
        }
    }
    out.trim_end().to_string()
}

pub fn saved(entries: &[SavedArticle], tz: Tz) -> String {
    if entries.is_empty() {
        return "no saved articles".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(n, entry)| {
            let when = entry
                .published_at
                .map(|at| timestamp(at, tz))
                .unwrap_or_else(|| "undated".to_string());
            let link = entry.url.as_ref().map(|u| u.as_str()).unwrap_or_default();
            format!("{:>3}. {}  ({when})  {link}", n + 1, entry.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strongest preferences first.
pub fn tag_weights(weights: &TagWeights) -> String {
    if weights.is_empty() {
        return "no tag preferences yet".to_string();
    }
    let mut entries: Vec<(&String, &f64)> = weights.iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    entries
        .into_iter()
        .map(|(tag, weight)| format!("{weight:>+6.1}  {tag}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn settings(settings: &AppSettings) -> String {
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    let sources = if settings.preferred_sources.is_empty() {
        "(none)".to_string()
    } else {
        settings.preferred_sources.join(", ")
    };
    [
        format!("newsdata:          {}", on_off(settings.enable_newsdata)),
        format!("rss:               {}", on_off(settings.enable_rss)),
        format!("languages:         {}", settings.languages.join(", ")),
        format!("countries:         {}", settings.countries.join(", ")),
        format!("preferred sources: {sources}"),
        format!("quality mode:      {}", on_off(settings.quality_mode)),
        format!("images:            {}", on_off(settings.show_images)),
        format!("descriptions:      {}", on_off(settings.show_descriptions)),
        format!("tags:              {}", on_off(settings.enable_tags)),
        format!("inline reader:     {}", on_off(settings.enable_inline_view)),
        format!("confirm unsave:    {}", on_off(settings.confirm_unsave)),
    ]
    .join("\n")
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
