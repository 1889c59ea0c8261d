use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Feed;
use crate::utils;

#[derive(Debug, Error)]
pub enum FeedStoreError {
    #[error("a feed with id `{0}` already exists")]
    DuplicateFeed(String),
    #[error("unknown feed `{0}`")]
    UnknownFeed(String),
    #[error("feed name must contain at least one letter or digit")]
    InvalidName,
    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("feed file parse error: {0}")]
    Parse(String),
    #[error("feed store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,
    pub feeds: Vec<Feed>,
}

impl AppConfig {
    pub fn feed(&self, id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|feed| feed.id == id)
    }

    /// Pretty JSON meant to be committed next to the rest of a site's content.
    pub fn to_pretty_json(&self) -> Result<String, FeedStoreError> {
        serde_json::to_string_pretty(self).map_err(|err| FeedStoreError::Parse(err.to_string()))
    }

    pub fn from_json(contents: &str) -> Result<Self, FeedStoreError> {
        serde_json::from_str(contents).map_err(|err| FeedStoreError::Parse(err.to_string()))
    }
}

pub struct FeedStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl FeedStore {
    pub fn open(path: PathBuf) -> Result<Self, FeedStoreError> {
        let data = read_config(&path)?;
        tracing::debug!(path = %path.display(), feeds = data.feeds.len(), "opened feed store");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<AppConfig, FeedStoreError> {
        self.data
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| FeedStoreError::Poisoned)
    }

    pub fn feeds(&self) -> Result<Vec<Feed>, FeedStoreError> {
        Ok(self.read()?.feeds)
    }

    pub fn feed(&self, id: &str) -> Result<Feed, FeedStoreError> {
        self.read()?
            .feed(id)
            .cloned()
            .ok_or_else(|| FeedStoreError::UnknownFeed(id.to_string()))
    }

    /// Applies `transform` and writes the result. Nothing is kept in memory
    /// when the transform or the write fails.
    pub fn update<F, T>(&self, transform: F) -> Result<T, FeedStoreError>
    where
        F: FnOnce(&mut AppConfig) -> Result<T, FeedStoreError>,
    {
        let mut guard = self.data.lock().map_err(|_| FeedStoreError::Poisoned)?;
        let mut next = guard.clone();
        let out = transform(&mut next)?;
        write_config(&self.path, &next)?;
        *guard = next;
        Ok(out)
    }

    pub fn create_feed(&self, name: &str) -> Result<Feed, FeedStoreError> {
        let name = name.trim();
        let id = utils::slugify(name);
        if id.is_empty() {
            return Err(FeedStoreError::InvalidName);
        }
        let feed = self.update(|config| {
            if config.feed(&id).is_some() {
                return Err(FeedStoreError::DuplicateFeed(id.clone()));
            }
            let feed = Feed::new(id.clone(), name);
            config.feeds.push(feed.clone());
            Ok(feed)
        })?;
        tracing::info!(feed = %feed.id, "created feed");
        Ok(feed)
    }

    pub fn update_feed<F>(&self, id: &str, transform: F) -> Result<Feed, FeedStoreError>
    where
        F: FnOnce(&mut Feed),
    {
        self.update(|config| {
            let feed = config
                .feeds
                .iter_mut()
                .find(|feed| feed.id == id)
                .ok_or_else(|| FeedStoreError::UnknownFeed(id.to_string()))?;
            transform(feed);
            Ok(feed.clone())
        })
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<Feed, FeedStoreError> {
        self.update_feed(id, |feed| feed.enabled = enabled)
    }

    /// Returns whether `uid` is pinned afterwards.
    pub fn toggle_selection(&self, id: &str, uid: &str) -> Result<bool, FeedStoreError> {
        let feed = self.update_feed(id, |feed| {
            feed.toggle_selection(uid);
        })?;
        Ok(feed.is_selected(uid))
    }

    pub fn remove_feed(&self, id: &str) -> Result<Feed, FeedStoreError> {
        self.update(|config| {
            let index = config
                .feeds
                .iter()
                .position(|feed| feed.id == id)
                .ok_or_else(|| FeedStoreError::UnknownFeed(id.to_string()))?;
            Ok(config.feeds.remove(index))
        })
    }
}

fn read_config(path: &Path) -> Result<AppConfig, FeedStoreError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| FeedStoreError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    AppConfig::from_json(&contents)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), FeedStoreError> {
    let io_err = |err: std::io::Error| FeedStoreError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let contents = config.to_pretty_json()?;
    fs::write(path, contents).map_err(io_err)
}
