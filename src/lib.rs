pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod dedupe;
pub mod matching;
pub mod models;
pub mod resolver;
pub mod timestamps;
mod utils;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use catalog::Catalog;
pub use models::{AutoCap, Event, Feed, FeedPreferences};
pub use resolver::{resolve_feed, resolve_feed_entries, Origin, Resolution, ResolvedEvent};

const DEFAULT_LOG_FILTER: &str = "feed_curator_lib=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();
    cli::execute(cli)
}
