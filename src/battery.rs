use serde::Serialize;

/// Five-step battery indicator level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatteryLevel {
    Empty,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl BatteryLevel {
    /// Maps a clamped percent to a level. Boundaries belong to the higher bucket.
    pub fn from_percent(percent: Option<f64>) -> Self {
        let Some(percent) = percent else {
            return Self::Empty;
        };
        if percent >= 80.0 {
            Self::Full
        } else if percent >= 60.0 {
            Self::ThreeQuarters
        } else if percent >= 40.0 {
            Self::Half
        } else if percent >= 20.0 {
            Self::Quarter
        } else {
            Self::Empty
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Quarter => "quarter",
            Self::Half => "half",
            Self::ThreeQuarters => "three-quarters",
            Self::Full => "full",
        }
    }
}

/// Clamps a raw reading into `[0, 100]`. NaN is treated as unknown.
pub fn clamp_percent(raw: f64) -> Option<f64> {
    if raw.is_nan() {
        return None;
    }
    Some(raw.clamp(0.0, 100.0))
}

/// Percent label shown next to the icon; absent when the percent is unknown.
pub fn percent_label(percent: Option<f64>) -> Option<String> {
    percent.map(|p| format!("{p}%"))
}
