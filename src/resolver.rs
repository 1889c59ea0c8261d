//! Turns a catalog plus one feed into the ordered list of events the feed shows.
//!
//! Manual picks come first and only need to be upcoming. The rest of the
//! catalog goes through the feed's preferences, gets capped in catalog order,
//! and both parts are then deduplicated by (normalized title, UTC date) and
//! sorted by start time. Nothing here fails: events with unreadable start
//! times are kept and sorted first.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dedupe;
use crate::matching;
use crate::models::{Event, Feed};
use crate::timestamps::{self, StartTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Manual,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEvent {
    pub origin: Origin,
    pub event: Event,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub entries: Vec<ResolvedEvent>,
    pub manual: usize,
    pub auto: usize,
    /// Auto matches cut off by the cap.
    pub capped: usize,
    pub duplicates: usize,
}

impl Resolution {
    pub fn events(&self) -> Vec<Event> {
        self.entries.iter().map(|entry| entry.event.clone()).collect()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.entries.into_iter().map(|entry| entry.event).collect()
    }
}

pub fn resolve_feed(catalog: &[Event], feed: &Feed, now: DateTime<Utc>) -> Vec<Event> {
    resolve_feed_entries(catalog, feed, now).into_events()
}

pub fn resolve_feed_entries(catalog: &[Event], feed: &Feed, now: DateTime<Utc>) -> Resolution {
    let selected: HashSet<&str> = feed.selected_events.iter().map(String::as_str).collect();
    let prefs = &feed.preferences;

    let mut manual_uids: HashSet<&str> = HashSet::new();
    let mut manual: Vec<ResolvedEvent> = Vec::new();
    for event in catalog {
        if !selected.contains(event.uid.as_str()) {
            continue;
        }
        if !timestamps::parse_start(&event.start_utc).not_before(now) {
            tracing::trace!(feed = %feed.id, uid = %event.uid, "manual pick already started");
            continue;
        }
        manual_uids.insert(event.uid.as_str());
        manual.push(ResolvedEvent {
            origin: Origin::Manual,
            event: event.clone(),
        });
    }

    let horizon = timestamps::horizon(now, prefs.days_ahead());
    let mut auto: Vec<ResolvedEvent> = Vec::new();
    for event in catalog {
        if manual_uids.contains(event.uid.as_str()) {
            continue;
        }
        if let Err(rejection) = matching::evaluate(event, prefs, now) {
            tracing::trace!(feed = %feed.id, uid = %event.uid, reason = rejection.as_str(), "skipped");
            continue;
        }
        let start = timestamps::parse_start(&event.start_utc);
        if let Some(limit) = horizon {
            if !start.not_after(limit) {
                continue;
            }
        }
        auto.push(ResolvedEvent {
            origin: Origin::Auto,
            event: event.clone(),
        });
    }

    let matched = auto.len();
    prefs.auto_cap().apply(&mut auto);
    let capped = matched - auto.len();

    let mut combined = manual;
    combined.extend(auto);
    let (mut entries, duplicates) = dedupe::dedupe_by(combined, |entry| &entry.event);
    entries.sort_by_cached_key(|entry| sort_key(&entry.event));

    let manual = entries
        .iter()
        .filter(|entry| entry.origin == Origin::Manual)
        .count();
    let auto = entries.len() - manual;
    tracing::debug!(
        feed = %feed.id,
        manual,
        auto,
        capped,
        duplicates,
        "resolved feed"
    );

    Resolution {
        entries,
        manual,
        auto,
        capped,
        duplicates,
    }
}

/// Unknown start times order before every readable one, then by raw text.
fn sort_key(event: &Event) -> (Option<DateTime<Utc>>, String) {
    let instant = match timestamps::parse_start(&event.start_utc) {
        StartTime::Unknown => None,
        start => start.instant(),
    };
    (instant, event.start_utc.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedPreferences;
    use chrono::TimeZone;
    use serde_json::Map;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
    }

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

    fn feed_with(prefs: FeedPreferences, selected: &[&str]) -> Feed {
        let mut feed = Feed::new("test", "Test");
        feed.preferences = prefs;
        feed.selected_events = selected.iter().map(|s| s.to_string()).collect();
        feed
    }

    fn uids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.uid.as_str()).collect()
    }

    #[test]
    fn test_scenario_a_keyword_match() {
        let mut lake = event("1", "Lake Festival", "2025-07-10T18:00:00Z");
        lake.source = Some("chamber-a".into());
        let prefs = FeedPreferences {
            keywords: Some(vec!["festival".into()]),
            days_ahead: Some(30),
            ..Default::default()
        };
        let out = resolve_feed(&[lake.clone()], &feed_with(prefs, &[]), now());
        assert_eq!(out, vec![lake]);
    }

    #[test]
    fn test_scenario_b_exclude_keyword() {
        let lake = event("1", "Lake Festival", "2025-07-10T18:00:00Z");
        let prefs = FeedPreferences {
            exclude_keywords: Some(vec!["festival".into()]),
            ..Default::default()
        };
        assert!(resolve_feed(&[lake], &feed_with(prefs, &[]), now()).is_empty());
    }

    #[test]
    fn test_scenario_c_duplicate_titles_collapse() {
        let catalog = vec![
            event("a", "Ice Fishing Derby!!", "2025-07-05T09:00:00Z"),
            event("b", "ice fishing derby", "2025-07-05T15:00:00Z"),
        ];
        let out = resolve_feed(&catalog, &feed_with(FeedPreferences::default(), &[]), now());
        assert_eq!(uids(&out), vec!["a"]);
    }

    #[test]
    fn test_scenario_d_past_manual_pick_dropped() {
        let catalog = vec![event("2", "Old Show", "2025-06-01T18:00:00Z")];
        let out = resolve_feed(&catalog, &feed_with(FeedPreferences::default(), &["2"]), now());
        assert!(out.is_empty());
    }

    #[test]
    fn test_scenario_e_cap_keeps_catalog_prefix() {
        let catalog = vec![
            event("x", "Second by date", "2025-07-20T18:00:00Z"),
            event("y", "First by date", "2025-07-02T18:00:00Z"),
        ];
        let prefs = FeedPreferences {
            max_auto_events: Some(1),
            ..Default::default()
        };
        let resolution = resolve_feed_entries(&catalog, &feed_with(prefs, &[]), now());
        assert_eq!(uids(&resolution.events()), vec!["x"]);
        assert_eq!(resolution.capped, 1);
    }

    #[test]
    fn test_manual_pick_ignores_preferences_and_window() {
        let catalog = vec![event("far", "Far Future Gala", "2027-01-01T00:00:00Z")];
        let prefs = FeedPreferences {
            keywords: Some(vec!["festival".into()]),
            days_ahead: Some(7),
            ..Default::default()
        };
        let resolution = resolve_feed_entries(&catalog, &feed_with(prefs, &["far"]), now());
        assert_eq!(resolution.manual, 1);
        assert_eq!(resolution.entries[0].origin, Origin::Manual);
    }

    #[test]
    fn test_manual_duplicate_beats_auto() {
        let catalog = vec![
            event("auto", "Derby", "2025-07-05T09:00:00Z"),
            event("pinned", "DERBY", "2025-07-05T12:00:00Z"),
        ];
        let resolution =
            resolve_feed_entries(&catalog, &feed_with(FeedPreferences::default(), &["pinned"]), now());
        assert_eq!(uids(&resolution.events()), vec!["pinned"]);
        assert_eq!(resolution.duplicates, 1);
        assert_eq!(resolution.auto, 0);
    }

    #[test]
    fn test_unknown_manual_uid_ignored() {
        let catalog = vec![event("1", "Show", "2025-07-05T09:00:00Z")];
        let out = resolve_feed(&catalog, &feed_with(FeedPreferences::default(), &["missing"]), now());
        assert_eq!(uids(&out), vec!["1"]);
    }

    #[test]
    fn test_manual_pick_not_counted_against_cap() {
        let catalog = vec![
            event("m", "Pinned", "2025-07-03T09:00:00Z"),
            event("a1", "Auto One", "2025-07-04T09:00:00Z"),
            event("a2", "Auto Two", "2025-07-05T09:00:00Z"),
        ];
        let prefs = FeedPreferences {
            max_auto_events: Some(1),
            ..Default::default()
        };
        let out = resolve_feed(&catalog, &feed_with(prefs, &["m"]), now());
        assert_eq!(uids(&out), vec!["m", "a1"]);
    }

    #[test]
    fn test_explicit_zero_cap_admits_no_auto_events() {
        let catalog = vec![event("a", "Auto", "2025-07-04T09:00:00Z")];
        let prefs = FeedPreferences {
            max_auto_events: Some(0),
            limit_auto_events: Some(true),
            ..Default::default()
        };
        assert!(resolve_feed(&catalog, &feed_with(prefs, &[]), now()).is_empty());
    }

    #[test]
    fn test_sorted_with_unknown_dates_first() {
        let catalog = vec![
            event("late", "Late", "2025-07-20T18:00:00Z"),
            event("tbd-b", "Mystery B", "tbd b"),
            event("early", "Early", "2025-07-02T18:00:00Z"),
            event("day", "Day Only", "2025-07-10"),
            event("tbd-a", "Mystery A", "tbd a"),
        ];
        let out = resolve_feed(&catalog, &feed_with(FeedPreferences::default(), &[]), now());
        assert_eq!(uids(&out), vec!["tbd-a", "tbd-b", "early", "day", "late"]);
    }

    #[test]
    fn test_idempotent() {
        let catalog = vec![
            event("1", "One", "2025-07-02T18:00:00Z"),
            event("2", "one!", "2025-07-02T20:00:00Z"),
            event("3", "Three", "garbage"),
        ];
        let feed = feed_with(FeedPreferences::default(), &["2"]);
        assert_eq!(
            resolve_feed_entries(&catalog, &feed, now()),
            resolve_feed_entries(&catalog, &feed, now())
        );
    }

    #[test]
    fn test_enabled_flag_does_not_matter() {
        let catalog = vec![event("1", "One", "2025-07-02T18:00:00Z")];
        let mut feed = feed_with(FeedPreferences::default(), &[]);
        feed.enabled = false;
        assert_eq!(resolve_feed(&catalog, &feed, now()).len(), 1);
    }
}
