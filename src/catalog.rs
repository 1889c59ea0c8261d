use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::Event;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unable to read report {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("report parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Report artifacts come either as a bare array or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Report {
    Events(Vec<Event>),
    Wrapped { events: Vec<Event> },
}

/// Read-only view over every known event, in report order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<Event>,
}

impl Catalog {
    pub fn new(events: Vec<Event>) -> Self {
        let events = events.into_iter().map(with_uid).collect();
        Self { events }
    }

    pub fn from_report_str(contents: &str) -> Result<Self, CatalogError> {
        let events = match serde_json::from_str::<Report>(contents)? {
            Report::Events(events) => events,
            Report::Wrapped { events } => events,
        };
        Ok(Self::new(events))
    }

    pub fn load_report(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_report_str(&contents)?;
        tracing::debug!(path = %path.display(), events = catalog.len(), "loaded catalog report");
        Ok(catalog)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, uid: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.uid == uid)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Distinct non-empty sources, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.source.as_deref())
            .map(str::trim)
            .filter(|source| !source.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Stable uid for rows the report left without one: source|start_utc|title.
pub fn fallback_uid(event: &Event) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event.source.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(event.start_utc.as_bytes());
    hasher.update(b"|");
    hasher.update(event.title.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn with_uid(mut event: Event) -> Event {
    if event.uid.trim().is_empty() {
        event.uid = fallback_uid(&event);
    }
    event
}
