mod app;
mod classifier;
mod config;
mod console;
mod db;
mod domain;
mod feed;
mod infrastructure;
mod sources;
mod stores;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::NewsApp::initialize(config, paths, shutdown).await?;
    app.run().await
}
