//! Locale mapping, message catalog and date/time formatting.
//!
//! Every user-facing string on the calendar page goes through a
//! [`LocaleFormatter`], which pairs a [`Locale`] with the viewer's UTC
//! offset. The tag → identifier table below is the only place a locale is
//! mapped, so switching `lang` swaps every string at once.

use crate::occurrence::{EventTime, INVALID_DATE, OccurrenceRecord};
use std::collections::HashMap;
use std::sync::LazyLock;
use time::macros::format_description;
use crate::zone::ViewerZone;
use time::{Date, OffsetDateTime, Weekday};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Ko,
}

/// (locale, short tag, full identifier)
const LOCALE_TABLE: &[(Locale, &str, &str)] = &[
    (Locale::En, "en", "en-US"),
    (Locale::Ko, "ko", "ko-KR"),
];

impl Locale {
    pub const DEFAULT: Locale = Locale::En;
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Ko];

    /// Normalizes a tag by prefix (`ko`, `ko-KR`, `KO_kr` → `Ko`).
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_ascii_lowercase();
        LOCALE_TABLE
            .iter()
            .find(|(_, short, _)| normalized.starts_with(short))
            .map(|(locale, _, _)| *locale)
    }

    /// Parses `tag`, falling back to `fallback` when absent or unsupported.
    pub fn resolve(tag: Option<&str>, fallback: Locale) -> Self {
        tag.and_then(Self::parse).unwrap_or(fallback)
    }

    pub fn tag(self) -> &'static str {
        self.entry().1
    }

    pub fn identifier(self) -> &'static str {
        self.entry().2
    }

    fn entry(self) -> &'static (Locale, &'static str, &'static str) {
        LOCALE_TABLE
            .iter()
            .find(|(locale, _, _)| *locale == self)
            .unwrap_or(&LOCALE_TABLE[0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Date,
    Weekday,
    ClockTime,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Today,
    NoEvents,
    AllDayPrefix,
    LastUpdatedPrefix,
    LoadError,
    Loading,
    NoTitle,
}

impl MessageKey {
    pub const ALL: [MessageKey; 7] = [
        MessageKey::Today,
        MessageKey::NoEvents,
        MessageKey::AllDayPrefix,
        MessageKey::LastUpdatedPrefix,
        MessageKey::LoadError,
        MessageKey::Loading,
        MessageKey::NoTitle,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MessageKey::Today => "calendar.today",
            MessageKey::NoEvents => "calendar.no_events",
            MessageKey::AllDayPrefix => "calendar.all_day_prefix",
            MessageKey::LastUpdatedPrefix => "calendar.last_updated_prefix",
            MessageKey::LoadError => "calendar.error.load",
            MessageKey::Loading => "calendar.loading",
            MessageKey::NoTitle => "calendar.no_title",
        }
    }
}

const EN_MESSAGES: &[(&str, &str)] = &[
    ("calendar.today", "Today"),
    ("calendar.no_events", "No events"),
    ("calendar.all_day_prefix", "All-day · "),
    ("calendar.last_updated_prefix", "Last updated:"),
    ("calendar.error.load", "An error occurred while loading data."),
    ("calendar.loading", "Loading..."),
    ("calendar.no_title", "(No title)"),
];

const KO_MESSAGES: &[(&str, &str)] = &[
    ("calendar.today", "오늘"),
    ("calendar.no_events", "일정 없음"),
    ("calendar.all_day_prefix", "종일 · "),
    ("calendar.last_updated_prefix", "마지막 업데이트:"),
    ("calendar.error.load", "데이터를 불러오는 중 오류가 발생했습니다."),
    ("calendar.loading", "로딩 중..."),
    ("calendar.no_title", "(제목 없음)"),
];

const EN_WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const KO_WEEKDAYS: [&str; 7] = ["월", "화", "수", "목", "금", "토", "일"];

#[derive(Debug)]
struct Catalog {
    by_locale: HashMap<Locale, HashMap<&'static str, &'static str>>,
}

impl Catalog {
    fn load() -> Self {
        let mut by_locale = HashMap::new();
        for locale in Locale::ALL {
            let table = match locale {
                Locale::En => EN_MESSAGES,
                Locale::Ko => KO_MESSAGES,
            };
            by_locale.insert(locale, table.iter().copied().collect());
        }
        Self { by_locale }
    }

    fn lookup(&self, locale: Locale, key: &str) -> Option<&'static str> {
        self.by_locale.get(&locale)?.get(key).copied()
    }
}

static CATALOG: LazyLock<Catalog> = LazyLock::new(Catalog::load);

pub fn message(locale: Locale, key: MessageKey) -> &'static str {
    if let Some(text) = CATALOG.lookup(locale, key.key()) {
        return text;
    }
    warn!(locale = locale.tag(), key = key.key(), "Missing catalog entry");
    CATALOG
        .lookup(Locale::DEFAULT, key.key())
        .unwrap_or_else(|| key.key())
}

#[derive(Debug, Clone, Copy)]
pub struct LocaleFormatter {
    locale: Locale,
    zone: ViewerZone,
}

impl LocaleFormatter {
    pub fn new(locale: Locale, zone: impl Into<ViewerZone>) -> Self {
        Self {
            locale,
            zone: zone.into(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn zone(&self) -> ViewerZone {
        self.zone
    }

    /// Converts an instant to the viewer's wall clock.
    pub fn local(&self, instant: OffsetDateTime) -> OffsetDateTime {
        self.zone.local(instant)
    }

    pub fn message(&self, key: MessageKey) -> &'static str {
        message(self.locale, key)
    }

    pub fn weekday_short(&self, weekday: Weekday) -> &'static str {
        let index = weekday.number_days_from_monday() as usize;
        match self.locale {
            Locale::En => EN_WEEKDAYS[index],
            Locale::Ko => KO_WEEKDAYS[index],
        }
    }

    pub fn format_date(&self, date: Date) -> Result<String, time::error::Format> {
        match self.locale {
            Locale::En => date.format(format_description!("[month]/[day]/[year]")),
            Locale::Ko => date.format(format_description!("[year]. [month]. [day].")),
        }
    }

    pub fn format(
        &self,
        instant: OffsetDateTime,
        kind: FormatKind,
    ) -> Result<String, time::error::Format> {
        let local = self.local(instant);
        match kind {
            FormatKind::Date => self.format_date(local.date()),
            FormatKind::Weekday => Ok(self.weekday_short(local.weekday()).to_string()),
            FormatKind::ClockTime => local.format(format_description!("[hour]:[minute]")),
            FormatKind::DateTime => Ok(format!(
                "{} {}",
                self.format_date(local.date())?,
                local.format(format_description!("[hour]:[minute]"))?
            )),
        }
    }

    /// One line of a day cell: `<all-day marker><title>` or `HH:MM~HH:MM <title>`.
    pub fn event_line(&self, record: &OccurrenceRecord) -> String {
        let title = if record.summary.is_empty() {
            self.message(MessageKey::NoTitle)
        } else {
            record.summary.as_str()
        };

        if record.all_day {
            return format!("{}{}", self.message(MessageKey::AllDayPrefix), title);
        }

        format!(
            "{}~{} {}",
            self.clock(&record.start),
            self.clock(&record.end),
            title
        )
    }

    fn clock(&self, time: &EventTime) -> String {
        time.instant()
            .and_then(|instant| self.format(instant, FormatKind::ClockTime).ok())
            .unwrap_or_else(|| INVALID_DATE.to_string())
    }
}
