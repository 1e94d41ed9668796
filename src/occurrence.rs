//! Occurrence records as received from the events source, and the
//! per-day index built from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use crate::zone::ViewerZone;
use time::{Date, OffsetDateTime};

/// Key used for occurrences whose start instant does not parse.
pub const INVALID_DATE: &str = "Invalid Date";

/// Day cells surface at most this many occurrences; the rest are dropped silently.
pub const MAX_VISIBLE_PER_DAY: usize = 3;

/// An instant exactly as the events source sent it, plus its parsed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EventTime {
    raw: String,
    parsed: Option<OffsetDateTime>,
}

impl EventTime {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> Option<OffsetDateTime> {
        self.parsed
    }
}

impl From<String> for EventTime {
    fn from(raw: String) -> Self {
        let parsed = OffsetDateTime::parse(raw.trim(), &Rfc3339).ok();
        Self { raw, parsed }
    }
}

impl From<EventTime> for String {
    fn from(time: EventTime) -> Self {
        time.raw
    }
}

impl From<OffsetDateTime> for EventTime {
    fn from(instant: OffsetDateTime) -> Self {
        let raw = instant.format(&Rfc3339).unwrap_or_default();
        Self {
            raw,
            parsed: Some(instant),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub instance_key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub all_day: bool,
    pub start: EventTime,
    pub end: EventTime,
}

/// Canonical `YYYY-MM-DD` grouping key. Never displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(String);

impl DateKey {
    pub fn from_date(date: Date) -> Self {
        let key = date
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| INVALID_DATE.to_string());
        Self(key)
    }

    /// Key of the viewer-local calendar date containing `time`.
    pub fn from_time(time: &EventTime, zone: impl Into<ViewerZone>) -> Self {
        let zone = zone.into();
        match time.instant() {
            Some(instant) => Self::from_date(zone.local(instant).date()),
            None => Self::invalid(),
        }
    }

    pub fn invalid() -> Self {
        Self(INVALID_DATE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Occurrences grouped by the local date of their start, in arrival order.
///
/// Multi-day and all-day spans appear only under their start date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccurrenceIndex {
    buckets: HashMap<DateKey, Vec<OccurrenceRecord>>,
    total: usize,
}

impl OccurrenceIndex {
    pub fn build(
        records: impl IntoIterator<Item = OccurrenceRecord>,
        zone: impl Into<ViewerZone>,
    ) -> Self {
        let zone = zone.into();
        let mut buckets: HashMap<DateKey, Vec<OccurrenceRecord>> = HashMap::new();
        let mut total = 0;
        for record in records {
            let key = DateKey::from_time(&record.start, zone);
            buckets.entry(key).or_default().push(record);
            total += 1;
        }
        Self { buckets, total }
    }

    pub fn day(&self, key: &DateKey) -> &[OccurrenceRecord] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Occurrences shown in the cell for `date`, truncated to [`MAX_VISIBLE_PER_DAY`].
    pub fn visible(&self, date: Date) -> &[OccurrenceRecord] {
        let all = self.day(&DateKey::from_date(date));
        &all[..all.len().min(MAX_VISIBLE_PER_DAY)]
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
