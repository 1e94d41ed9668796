use crate::battery::{BatteryLevel, percent_label};
use crate::error::AppError;
use crate::grid::{WeekdayHeader, build_grid, weekday_headers};
use crate::locale::{FormatKind, Locale, LocaleFormatter, MessageKey};
use crate::occurrence::DateKey;
use crate::state::PageState;
use askama::Template;

#[derive(Debug)]
pub struct DayCell {
    pub label: String,
    pub weekday_label: String,
    pub date_key: String,
    pub classes: String,
    pub is_today: bool,
    pub events: Vec<String>,
}

#[derive(Debug)]
pub struct HeaderCell {
    pub label: &'static str,
    pub classes: &'static str,
}

impl From<WeekdayHeader> for HeaderCell {
    fn from(header: WeekdayHeader) -> Self {
        Self {
            label: header.label,
            classes: if header.is_weekend {
                "weekday weekend"
            } else {
                "weekday"
            },
        }
    }
}

#[derive(Debug, Template)]
#[template(path = "calendar.html")]
pub struct CalendarPage {
    pub lang: &'static str,
    pub ready: bool,
    /// Set while pending so the browser comes back to the same instance.
    pub refresh_url: Option<String>,
    pub title_date: String,
    pub subtitle: String,
    pub last_updated_prefix: &'static str,
    pub last_updated: String,
    pub error: Option<&'static str>,
    pub headers: Vec<HeaderCell>,
    pub cells: Vec<DayCell>,
    pub battery_level: &'static str,
    pub battery_label: Option<String>,
    pub today_label: &'static str,
    pub no_events_label: &'static str,
}

/// Builds the page model from one consistent snapshot of `state`, which
/// belongs to page `instance`.
pub fn build_page(
    state: &PageState,
    locale: Locale,
    instance: u64,
) -> Result<CalendarPage, AppError> {
    let formatter = LocaleFormatter::new(locale, state.zone());
    let now = state.reference();
    let today = now.date();

    let cells = build_grid(today, state.week_start(), &formatter)?
        .into_iter()
        .map(|day| {
            let in_current_month = day.date.year() == today.year() && day.date.month() == today.month();
            let mut classes = String::from("day");
            if !in_current_month {
                classes.push_str(" outside");
            }
            if day.is_weekend {
                classes.push_str(" weekend");
            }
            if day.is_today {
                classes.push_str(" today");
            }
            let events = state
                .index()
                .visible(day.date)
                .iter()
                .map(|record| formatter.event_line(record))
                .collect();
            DayCell {
                label: day.label,
                weekday_label: day.weekday_label,
                date_key: DateKey::from_date(day.date).to_string(),
                classes,
                is_today: day.is_today,
                events,
            }
        })
        .collect();

    let last_updated = match state.last_updated_at() {
        Some(at) => formatter.format(at, FormatKind::DateTime)?,
        None => formatter.message(MessageKey::Loading).to_string(),
    };

    let percent = state.battery_percent();
    let ready = state.is_ready();

    Ok(CalendarPage {
        lang: locale.tag(),
        ready,
        refresh_url: (!ready)
            .then(|| format!("/calendar?lang={}&instance={instance}", locale.tag())),
        title_date: formatter.format(now, FormatKind::Date)?,
        subtitle: format!(
            "{} · {} · {}",
            formatter.format(now, FormatKind::Weekday)?,
            state.display_timezone(),
            formatter.format(now, FormatKind::ClockTime)?
        ),
        last_updated_prefix: formatter.message(MessageKey::LastUpdatedPrefix),
        last_updated,
        error: state
            .events_error()
            .map(|_| formatter.message(MessageKey::LoadError)),
        headers: weekday_headers(state.week_start(), &formatter)
            .into_iter()
            .map(HeaderCell::from)
            .collect(),
        cells,
        battery_level: BatteryLevel::from_percent(percent).as_str(),
        battery_label: percent_label(percent),
        today_label: formatter.message(MessageKey::Today),
        no_events_label: formatter.message(MessageKey::NoEvents),
    })
}

pub fn render(state: &PageState, locale: Locale, instance: u64) -> Result<String, AppError> {
    Ok(build_page(state, locale, instance)?.render()?)
}
