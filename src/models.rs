use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_DAYS_AHEAD: i64 = 180;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uid: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub start_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    // report fields the engine never reads (images, videos, tags...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Reports write `null` for fields they could not scrape.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Event {
    /// Text searched by keyword preferences: the title followed by the location.
    pub fn search_text(&self) -> String {
        match self.location.as_deref() {
            Some(location) if !location.is_empty() => format!("{} {}", self.title, location),
            _ => self.title.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Feed {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub selected_events: Vec<String>,
    #[serde(default)]
    pub preferences: FeedPreferences,
}

fn default_enabled() -> bool {
    true
}

impl Feed {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            selected_events: Vec::new(),
            preferences: FeedPreferences::default(),
        }
    }

    pub fn is_selected(&self, uid: &str) -> bool {
        self.selected_events.iter().any(|selected| selected == uid)
    }

    /// Pins `uid` if it is not pinned yet, unpins it otherwise.
    /// Returns whether the event is pinned afterwards.
    pub fn toggle_selection(&mut self, uid: &str) -> bool {
        if self.is_selected(uid) {
            self.selected_events.retain(|selected| selected != uid);
            false
        } else {
            self.selected_events.push(uid.to_string());
            true
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FeedPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_sources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_sources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_ahead: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_auto_events: Option<i64>,
    /// Explicit switch for `max_auto_events`. Left unset, a value `<= 0`
    /// means "no cap" for compatibility with feeds saved before the switch existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_auto_events: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoCap {
    Unlimited,
    Limit(usize),
}

impl AutoCap {
    pub fn apply<T>(self, items: &mut Vec<T>) {
        if let AutoCap::Limit(limit) = self {
            items.truncate(limit);
        }
    }
}

impl FeedPreferences {
    pub fn days_ahead(&self) -> i64 {
        self.days_ahead.unwrap_or(DEFAULT_DAYS_AHEAD)
    }

    pub fn auto_cap(&self) -> AutoCap {
        let max = self.max_auto_events.unwrap_or(0);
        match self.limit_auto_events {
            Some(false) => AutoCap::Unlimited,
            Some(true) => AutoCap::Limit(usize::try_from(max).unwrap_or(0)),
            None if max > 0 => AutoCap::Limit(usize::try_from(max).unwrap_or(usize::MAX)),
            None => AutoCap::Unlimited,
        }
    }
}
