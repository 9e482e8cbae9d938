pub mod env;
mod loader;

pub use env::{AppConfig, DirectoryConfig, NewsdataConfig, RssBackendConfig};
pub use loader::load_config;
