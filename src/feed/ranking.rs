use std::{cmp::Ordering, collections::HashSet};

use crate::domain::{AppSettings, Article, TagWeights};

pub const PREFERRED_SOURCE_BONUS: f64 = 2.0;

/// Category weight plus the preferred-source bonus. AI tags do not score.
pub fn score(article: &Article, tag_weights: &TagWeights, preferred_hosts: &HashSet<String>) -> f64 {
    let key = article
        .category
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let weight = tag_weights.get(&key).copied().unwrap_or(0.0);
    let bonus = match article.host() {
        Some(host) if preferred_hosts.contains(&host) => PREFERRED_SOURCE_BONUS,
        _ => 0.0,
    };
    weight + bonus
}

/// Newest first; equal dates (including two undated articles) fall back to
/// score. The sort is stable so remaining ties keep their input order.
pub fn rank(articles: Vec<Article>, settings: &AppSettings, tag_weights: &TagWeights) -> Vec<Article> {
    let preferred_hosts = settings.preferred_domain_set();
    let mut scored: Vec<(f64, Article)> = articles
        .into_iter()
        .map(|article| (score(&article, tag_weights, &preferred_hosts), article))
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        // None < Some, so undated articles sink to the bottom
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| score_b.partial_cmp(score_a).unwrap_or(Ordering::Equal))
    });

    scored.into_iter().map(|(_, article)| article).collect()
}
