//! The viewer's time zone. Every instant is converted with the zone's
//! rules at that instant, so a grid spanning a DST change buckets and
//! formats both sides correctly.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerZone {
    /// IANA zone resolved through the tz database.
    Named(Tz),
    Fixed(UtcOffset),
}

impl ViewerZone {
    pub const UTC: ViewerZone = ViewerZone::Fixed(UtcOffset::UTC);

    /// Accepts an IANA name (`Asia/Seoul`), `UTC` / `Z`, or `±HH:MM`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
            return Some(Self::UTC);
        }
        if trimmed.starts_with(['+', '-']) {
            return UtcOffset::parse(
                trimmed,
                format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
            )
            .ok()
            .map(Self::Fixed);
        }
        trimmed.parse::<Tz>().ok().map(Self::Named)
    }

    /// The host's zone, or UTC when it cannot be determined.
    pub fn detect() -> Self {
        match iana_time_zone::get_timezone() {
            Ok(name) => Self::parse(&name).unwrap_or_else(|| {
                warn!(timezone = %name, "Unknown host timezone, using UTC");
                Self::UTC
            }),
            Err(err) => {
                warn!(error = %err, "Host timezone unavailable, using UTC");
                Self::UTC
            }
        }
    }

    /// UTC offset in effect at `instant`.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        match self {
            Self::Fixed(offset) => *offset,
            Self::Named(tz) => {
                let seconds = DateTime::<Utc>::from_timestamp(instant.unix_timestamp(), 0)
                    .map(|utc| {
                        tz.offset_from_utc_datetime(&utc.naive_utc())
                            .fix()
                            .local_minus_utc()
                    })
                    .unwrap_or(0);
                UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
            }
        }
    }

    /// `instant` on the viewer's wall clock.
    pub fn local(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant.to_offset(self.offset_at(instant))
    }
}

impl Default for ViewerZone {
    fn default() -> Self {
        Self::UTC
    }
}

impl From<UtcOffset> for ViewerZone {
    fn from(offset: UtcOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl From<Tz> for ViewerZone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

impl fmt::Display for ViewerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => f.write_str(tz.name()),
            Self::Fixed(offset) if offset.is_utc() => f.write_str("UTC"),
            Self::Fixed(offset) => {
                let (hours, minutes, _) = offset.as_hms();
                let sign = if offset.is_negative() { '-' } else { '+' };
                write!(f, "{sign}{:02}:{:02}", hours.abs(), minutes.abs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn parses_names_offsets_and_utc() {
        assert_eq!(
            ViewerZone::parse("Asia/Seoul"),
            Some(ViewerZone::Named(chrono_tz::Asia::Seoul))
        );
        assert_eq!(ViewerZone::parse("+09:00"), Some(ViewerZone::Fixed(offset!(+9))));
        assert_eq!(ViewerZone::parse("-05:30"), Some(ViewerZone::Fixed(offset!(-5:30))));
        assert_eq!(ViewerZone::parse(" utc "), Some(ViewerZone::UTC));
        assert_eq!(ViewerZone::parse("Z"), Some(ViewerZone::UTC));
        assert_eq!(ViewerZone::parse("Mars/Olympus"), None);
        assert_eq!(ViewerZone::parse("+9"), None);
        assert_eq!(ViewerZone::parse(""), None);
    }

    #[test]
    fn named_zone_follows_dst_rules() {
        let new_york = ViewerZone::Named(chrono_tz::America::New_York);
        assert_eq!(new_york.offset_at(datetime!(2024-03-01 12:00 UTC)), offset!(-5));
        assert_eq!(new_york.offset_at(datetime!(2024-03-10 06:59 UTC)), offset!(-5));
        assert_eq!(new_york.offset_at(datetime!(2024-03-10 07:00 UTC)), offset!(-4));
        assert_eq!(new_york.offset_at(datetime!(2024-11-03 06:00 UTC)), offset!(-5));
    }

    #[test]
    fn local_keeps_the_instant() {
        let new_york = ViewerZone::Named(chrono_tz::America::New_York);
        let instant = datetime!(2024-03-12 04:30 UTC);
        let local = new_york.local(instant);
        assert_eq!(local, instant);
        assert_eq!(local.hour(), 0);
        assert_eq!(local.day(), 12);
    }

    #[test]
    fn fixed_zone_ignores_dst() {
        let zone = ViewerZone::from(offset!(+9));
        assert_eq!(zone.offset_at(datetime!(2024-07-01 00:00 UTC)), offset!(+9));
    }

    #[test]
    fn display_names_the_zone() {
        assert_eq!(ViewerZone::Named(chrono_tz::Europe::Berlin).to_string(), "Europe/Berlin");
        assert_eq!(ViewerZone::UTC.to_string(), "UTC");
        assert_eq!(ViewerZone::from(offset!(-5:30)).to_string(), "-05:30");
    }
}
