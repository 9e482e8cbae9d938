//! Query building, fan-out fetch, ranking and the refresh lifecycle.

pub mod aggregator;
pub mod query;
pub mod ranking;
pub mod refresh;
pub mod service;

pub use aggregator::Aggregator;
pub use refresh::RefreshGate;
pub use service::{FeedService, RefreshOutcome};
