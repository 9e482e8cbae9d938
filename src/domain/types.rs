use std::{collections::BTreeMap, fmt};

/// Lowercase tag -> signed preference weight.
pub type TagWeights = BTreeMap<String, f64>;

/// Weights are only clamped to this range by the console, never by the store.
pub const WEIGHT_LIMIT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Newsdata,
    RssBackend,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Newsdata => "newsdata",
            SourceKind::RssBackend => "rss",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trims and lowercases a tag name; returns `None` when nothing is left.
pub fn normalize_tag_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
