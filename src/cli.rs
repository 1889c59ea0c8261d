use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::FeedStore;
use crate::db::Store;
use crate::models::{Event, Feed};
use crate::resolver::{self, Origin};
use crate::utils;

#[derive(Parser, Debug)]
#[command(name = "feed-curator", version)]
#[command(about = "Curate named event feeds from a shared catalog", long_about = None)]
pub struct Cli {
    /// Directory holding feeds.json and the catalog cache
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace the cached catalog with a JSON report
    Import {
        /// Defaults to the last imported report
        report: Option<PathBuf>,
    },

    /// List the distinct event sources in the cached catalog
    Sources,

    /// List feeds
    Feeds,

    /// Create a feed; its id is derived from the name
    New { name: String },

    /// Pin an event to a feed, or unpin it if already pinned
    Pin { feed: String, uid: String },

    /// Enable or disable a feed
    Toggle { feed: String },

    /// Delete a feed
    Remove { feed: String },

    /// Show the events a feed currently resolves to
    Preview {
        feed: String,
        /// Reference time (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write every enabled feed's events to a JSON file
    Export {
        out: PathBuf,
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Serialize)]
struct ExportedFeed<'a> {
    id: &'a str,
    name: &'a str,
    events: Vec<Event>,
}

#[derive(Serialize)]
struct Export<'a> {
    generated_at: String,
    feeds: Vec<ExportedFeed<'a>>,
}

struct Workspace {
    feeds: FeedStore,
    catalog_db: PathBuf,
}

impl Workspace {
    fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let root = data_dir.unwrap_or_else(utils::data_root);
        let feeds = FeedStore::open(utils::config_path(&root))
            .context("failed to open feed store")?;
        Ok(Self {
            feeds,
            catalog_db: utils::database_path(&root),
        })
    }

    fn store(&self) -> Result<Store> {
        Store::open(&self.catalog_db)
            .with_context(|| format!("failed to open catalog cache {}", self.catalog_db.display()))
    }

    fn catalog(&self) -> Result<Vec<Event>> {
        self.store()?
            .list_events()
            .context("failed to read cached catalog")
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let ws = Workspace::new(cli.data_dir)?;
    match cli.command {
        Commands::Import { report } => import(&ws, report),
        Commands::Sources => {
            let catalog = Catalog::new(ws.catalog()?);
            for source in catalog.sources() {
                println!("{source}");
            }
            Ok(())
        }
        Commands::Feeds => {
            for feed in ws.feeds.feeds()? {
                let state = if feed.enabled { "on " } else { "off" };
                println!(
                    "{state}  {:<24} {:<32} {} pinned",
                    feed.id,
                    feed.name,
                    feed.selected_events.len()
                );
            }
            Ok(())
        }
        Commands::New { name } => {
            let feed = ws.feeds.create_feed(&name)?;
            println!("created feed {}", feed.id);
            Ok(())
        }
        Commands::Pin { feed, uid } => {
            if !is_cached(&ws.store()?, &uid)? {
                tracing::warn!(uid = %uid, "event is not in the cached catalog");
            }
            let pinned = ws.feeds.toggle_selection(&feed, &uid)?;
            println!("{} {uid} on {feed}", if pinned { "pinned" } else { "unpinned" });
            Ok(())
        }
        Commands::Toggle { feed } => {
            let current = ws.feeds.feed(&feed)?;
            let updated = ws.feeds.set_enabled(&feed, !current.enabled)?;
            println!(
                "{} is now {}",
                updated.id,
                if updated.enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        Commands::Remove { feed } => {
            let removed = ws.feeds.remove_feed(&feed)?;
            println!("removed feed {}", removed.id);
            Ok(())
        }
        Commands::Preview { feed, now, json } => {
            let feed = ws.feeds.feed(&feed)?;
            preview(&ws, &feed, now.unwrap_or_else(Utc::now), json)
        }
        Commands::Export { out, now } => export(&ws, out, now.unwrap_or_else(Utc::now)),
    }
}

fn is_cached(store: &Store, uid: &str) -> Result<bool> {
    match store.get_event(uid) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to look up event {uid}")),
    }
}

fn import(ws: &Workspace, report: Option<PathBuf>) -> Result<()> {
    let report = match report {
        Some(report) => report,
        None => match ws.feeds.read()?.catalog_path {
            Some(last) => PathBuf::from(last),
            None => bail!("no report given and none imported before"),
        },
    };
    let catalog = Catalog::load_report(&report)
        .with_context(|| format!("failed to load report {}", report.display()))?;
    if catalog.is_empty() {
        bail!("report {} holds no events", report.display());
    }
    let count = ws.store()?.replace_catalog(catalog.events())?;
    let report_path = report.display().to_string();
    ws.feeds.update(|config| {
        config.catalog_path = Some(report_path);
        Ok(())
    })?;
    println!("imported {count} events from {} sources", catalog.sources().len());
    Ok(())
}

fn preview(ws: &Workspace, feed: &Feed, now: DateTime<Utc>, json: bool) -> Result<()> {
    let catalog = ws.catalog()?;
    let resolution = resolver::resolve_feed_entries(&catalog, feed, now);
    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }
    for entry in &resolution.entries {
        let marker = match entry.origin {
            Origin::Manual => "*",
            Origin::Auto => " ",
        };
        println!(
            "{marker} {:<25} {:<40} {}",
            entry.event.start_utc,
            entry.event.title,
            entry.event.location.as_deref().unwrap_or("")
        );
    }
    println!(
        "{} events ({} pinned, {} matched, {} capped, {} duplicates dropped)",
        resolution.entries.len(),
        resolution.manual,
        resolution.auto,
        resolution.capped,
        resolution.duplicates
    );
    Ok(())
}

fn export(ws: &Workspace, out: PathBuf, now: DateTime<Utc>) -> Result<()> {
    let catalog = ws.catalog()?;
    let feeds = ws.feeds.feeds()?;
    let exported: Vec<ExportedFeed<'_>> = feeds
        .iter()
        .filter(|feed| feed.enabled)
        .map(|feed| ExportedFeed {
            id: &feed.id,
            name: &feed.name,
            events: resolver::resolve_feed(&catalog, feed, now),
        })
        .collect();
    let export = Export {
        generated_at: now.to_rfc3339(),
        feeds: exported,
    };
    utils::ensure_parent(&out);
    fs::write(&out, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(path = %out.display(), feeds = export.feeds.len(), "exported feeds");
    println!("wrote {} feeds to {}", export.feeds.len(), out.display());
    Ok(())
}
