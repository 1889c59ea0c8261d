use chrono::{DateTime, Utc};

use crate::models::{Event, FeedPreferences};
use crate::timestamps::{self, StartTime};

/// The first preference check an event failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    OutsideWindow,
    SourceNotIncluded,
    SourceExcluded,
    LocationNotListed,
    ExcludedKeyword,
    MissingKeyword,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::OutsideWindow => "outside date window",
            Rejection::SourceNotIncluded => "source not included",
            Rejection::SourceExcluded => "source excluded",
            Rejection::LocationNotListed => "location not listed",
            Rejection::ExcludedKeyword => "excluded keyword",
            Rejection::MissingKeyword => "no keyword match",
        }
    }
}

/// Lower-cased, non-blank entries of an optional preference list.
/// `None` means the list places no constraint.
fn needles(list: &Option<Vec<String>>) -> Option<Vec<String>> {
    let cleaned: Vec<String> = list
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn contains_any(haystack: Option<&str>, needles: &[String]) -> bool {
    match haystack {
        Some(text) => {
            let lower = text.to_lowercase();
            needles.iter().any(|needle| lower.contains(needle.as_str()))
        }
        None => false,
    }
}

fn in_window(start: &StartTime, now: DateTime<Utc>, days_ahead: i64) -> bool {
    if !start.not_before(now) {
        return false;
    }
    match timestamps::horizon(now, days_ahead) {
        Some(limit) => start.before(limit),
        None => true,
    }
}

/// Runs the preference checks in their fixed order: date window, included
/// sources, excluded sources, locations, excluded keywords, keywords.
pub fn evaluate(
    event: &Event,
    prefs: &FeedPreferences,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    let start = timestamps::parse_start(&event.start_utc);
    if !in_window(&start, now, prefs.days_ahead()) {
        return Err(Rejection::OutsideWindow);
    }

    let source = event.source.as_deref();
    if let Some(include) = needles(&prefs.include_sources) {
        if !contains_any(source, &include) {
            return Err(Rejection::SourceNotIncluded);
        }
    }
    if let Some(exclude) = needles(&prefs.exclude_sources) {
        if contains_any(source, &exclude) {
            return Err(Rejection::SourceExcluded);
        }
    }

    if let Some(locations) = needles(&prefs.locations) {
        if !contains_any(event.location.as_deref(), &locations) {
            return Err(Rejection::LocationNotListed);
        }
    }

    let text = event.search_text();
    if let Some(excluded) = needles(&prefs.exclude_keywords) {
        if contains_any(Some(&text), &excluded) {
            return Err(Rejection::ExcludedKeyword);
        }
    }
    if let Some(keywords) = needles(&prefs.keywords) {
        if !contains_any(Some(&text), &keywords) {
            return Err(Rejection::MissingKeyword);
        }
    }

    Ok(())
}
