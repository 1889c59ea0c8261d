use std::{
    fs,
    path::{Path, PathBuf},
};

use dirs::data_dir;
use once_cell::sync::Lazy;

pub const HOME_ENV: &str = "FEED_CURATOR_HOME";

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return PathBuf::from(home);
        }
    }
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("feed-curator")
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path(root: &Path) -> PathBuf {
    root.join("catalog.sqlite")
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("feeds.json")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), error = %err, "failed to create parent");
        }
    }
}

/// Lower-case slug of letters and digits (any script): runs of anything
/// else collapse into a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Lake Events"), "lake-events");
        assert_eq!(slugify("  Kids & Family!! "), "kids-family");
        assert_eq!(slugify("2025 Summer"), "2025-summer");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_slugify_keeps_non_ascii_letters() {
        assert_eq!(slugify("Ярмарка"), "ярмарка");
        assert_eq!(slugify("Fête de la Musique"), "fête-de-la-musique");
    }

    #[test]
    fn test_paths_live_under_root() {
        let root = Path::new("/tmp/fc");
        assert_eq!(database_path(root), PathBuf::from("/tmp/fc/catalog.sqlite"));
        assert_eq!(config_path(root), PathBuf::from("/tmp/fc/feeds.json"));
    }
}
