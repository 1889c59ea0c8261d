use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// What could be read out of an event's `start_utc` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartTime {
    Exact(DateTime<Utc>),
    /// Only the leading `YYYY-MM-DD` was usable.
    Day(NaiveDate),
    Unknown,
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn parse_start(raw: &str) -> StartTime {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return StartTime::Unknown;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return StartTime::Exact(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS.iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return StartTime::Exact(naive.and_utc());
        }
    }
    match trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    {
        Some(day) => StartTime::Day(day),
        None => StartTime::Unknown,
    }
}

impl StartTime {
    /// Calendar date in UTC.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            StartTime::Exact(dt) => Some(dt.date_naive()),
            StartTime::Day(day) => Some(*day),
            StartTime::Unknown => None,
        }
    }

    /// Instant used for ordering. Day-only values sort at midnight UTC.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            StartTime::Exact(dt) => Some(*dt),
            StartTime::Day(day) => day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()),
            StartTime::Unknown => None,
        }
    }

    /// `start >= now`. Day-only values compare by date; unknown values pass.
    pub fn not_before(&self, now: DateTime<Utc>) -> bool {
        match self {
            StartTime::Exact(dt) => *dt >= now,
            StartTime::Day(day) => *day >= now.date_naive(),
            StartTime::Unknown => true,
        }
    }

    /// `start < limit`; unknown values pass.
    pub fn before(&self, limit: DateTime<Utc>) -> bool {
        match self.instant() {
            Some(instant) => instant < limit,
            None => true,
        }
    }

    /// `start <= limit`; unknown values pass.
    pub fn not_after(&self, limit: DateTime<Utc>) -> bool {
        match self.instant() {
            Some(instant) => instant <= limit,
            None => true,
        }
    }
}

/// `now + days`, or `None` when the horizon is too far out to represent.
pub fn horizon(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    chrono::Duration::try_days(days).and_then(|span| now.checked_add_signed(span))
}
