use std::collections::HashSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Event;
use crate::timestamps;

static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid punctuation regex"));

/// Identity of a real-world event across catalog refreshes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    pub title: String,
    pub date: NaiveDate,
}

/// Lower-cases, drops punctuation and collapses whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    PUNCTUATION_RE
        .replace_all(&lowered, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn dedupe_key(event: &Event) -> Option<DedupeKey> {
    let title = normalize_title(&event.title);
    if title.is_empty() {
        return None;
    }
    let date = timestamps::parse_start(&event.start_utc).date()?;
    Some(DedupeKey { title, date })
}

/// Keeps the first event for every key. Events without a key are always kept.
pub fn dedupe_by<T, F>(items: Vec<T>, event_of: F) -> (Vec<T>, usize)
where
    F: Fn(&T) -> &Event,
{
    let mut seen: HashSet<DedupeKey> = HashSet::new();
    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| match dedupe_key(event_of(item)) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn event(uid: &str, title: &str, start: &str) -> Event {
        Event {
            uid: uid.to_string(),
            title: title.to_string(),
            location: None,
            source: None,
            start_utc: start.to_string(),
            description: None,
            url: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Ice Fishing Derby!!"), "ice fishing derby");
        assert_eq!(normalize_title("  ice   fishing\tderby "), "ice fishing derby");
        assert_eq!(normalize_title("Rock 'n' Roll: Live!"), "rock n roll live");
        assert_eq!(normalize_title("Café Noël"), "café noël");
        assert_eq!(normalize_title("!!!"), "");
    }

    #[test]
    fn test_key_ignores_time_of_day() {
        let a = event("1", "Ice Fishing Derby!!", "2025-01-05T08:00:00Z");
        let b = event("2", "ice fishing derby", "2025-01-05T21:30:00Z");
        assert_eq!(dedupe_key(&a), dedupe_key(&b));
    }

    #[test]
    fn test_key_uses_utc_date() {
        // 23:30 at -07:00 is the next day in UTC
        let a = event("1", "Derby", "2025-01-05T23:30:00-07:00");
        let key = dedupe_key(&a).unwrap();
        assert_eq!(key.date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[test]
    fn test_no_key_without_title_or_date() {
        assert!(dedupe_key(&event("1", "", "2025-01-05T08:00:00Z")).is_none());
        assert!(dedupe_key(&event("1", "?!", "2025-01-05T08:00:00Z")).is_none());
        assert!(dedupe_key(&event("1", "Derby", "whenever")).is_none());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let events = vec![
            event("1", "Ice Fishing Derby!!", "2025-01-05T08:00:00Z"),
            event("2", "ice fishing derby", "2025-01-05T10:00:00Z"),
            event("3", "ice fishing derby", "2025-01-06T10:00:00Z"),
        ];
        let (kept, dropped) = dedupe_by(events, |e| e);
        assert_eq!(dropped, 1);
        let uids: Vec<&str> = kept.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["1", "3"]);
    }

    #[test]
    fn test_keyless_events_always_kept() {
        let events = vec![
            event("1", "", "2025-01-05T08:00:00Z"),
            event("2", "", "2025-01-05T08:00:00Z"),
            event("3", "Derby", "tbd"),
            event("4", "Derby", "tbd"),
        ];
        let (kept, dropped) = dedupe_by(events, |e| e);
        assert_eq!(kept.len(), 4);
        assert_eq!(dropped, 0);
    }
}
