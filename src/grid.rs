use crate::error::AppError;
use crate::locale::LocaleFormatter;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Weekday};

pub const GRID_WEEKS: usize = 5;
pub const GRID_DAYS: usize = GRID_WEEKS * 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// `"sunday"` selects Sunday; anything else, including absence, is Monday.
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("sunday") => Self::Sunday,
            _ => Self::Monday,
        }
    }

    pub fn first_weekday(self) -> Weekday {
        match self {
            Self::Monday => Weekday::Monday,
            Self::Sunday => Weekday::Sunday,
        }
    }

    /// Days back from `weekday` to the most recent week start, in `0..=6`.
    pub fn offset_from(self, weekday: Weekday) -> u8 {
        let day = weekday.number_days_from_sunday();
        match self {
            Self::Monday => (day + 6) % 7,
            Self::Sunday => day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: Date,
    pub label: String,
    pub weekday_label: String,
    pub is_today: bool,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdayHeader {
    pub label: &'static str,
    pub is_weekend: bool,
}

pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Saturday | Weekday::Sunday)
}

pub fn start_of_week(reference: Date, week_start: WeekStart) -> Result<Date, AppError> {
    let offset = week_start.offset_from(reference.weekday());
    reference
        .checked_sub(Duration::days(i64::from(offset)))
        .ok_or_else(|| AppError::DateRange(format!("week start before {reference}")))
}

/// Builds the five-week grid that contains `reference`, starting on the
/// configured week start.
pub fn build_grid(
    reference: Date,
    week_start: WeekStart,
    formatter: &LocaleFormatter,
) -> Result<Vec<CalendarDay>, AppError> {
    let anchor = start_of_week(reference, week_start)?;
    let mut days = Vec::with_capacity(GRID_DAYS);
    for i in 0..GRID_DAYS as i64 {
        let date = anchor
            .checked_add(Duration::days(i))
            .ok_or_else(|| AppError::DateRange(format!("{anchor} + {i} days")))?;
        days.push(CalendarDay {
            date,
            label: date.day().to_string(),
            weekday_label: formatter.weekday_short(date.weekday()).to_string(),
            is_today: date == reference,
            is_weekend: is_weekend(date.weekday()),
        });
    }
    Ok(days)
}

/// Column headers in display order for `week_start`.
pub fn weekday_headers(week_start: WeekStart, formatter: &LocaleFormatter) -> Vec<WeekdayHeader> {
    let mut weekday = week_start.first_weekday();
    let mut headers = Vec::with_capacity(7);
    for _ in 0..7 {
        headers.push(WeekdayHeader {
            label: formatter.weekday_short(weekday),
            is_weekend: is_weekend(weekday),
        });
        weekday = weekday.next();
    }
    headers
}
