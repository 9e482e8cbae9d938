pub mod article;
pub mod settings;
pub mod types;

pub use article::{Article, SavedArticle};
pub use settings::AppSettings;
pub use types::{SourceKind, TagWeights};
