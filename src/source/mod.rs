use crate::occurrence::OccurrenceRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

pub mod http;
pub mod mock;

pub const EVENTS_PATH: &str = "/api/events";
pub const BATTERY_PATH: &str = "/api/battery";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub range_start: String,
    #[serde(default)]
    pub range_end: String,
    #[serde(default)]
    pub display_timezone: String,
    #[serde(default)]
    pub week_start: Option<String>,
    #[serde(default)]
    pub occurrences: Option<Vec<OccurrenceRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryResponse {
    #[serde(default)]
    pub percent: Option<f64>,
}

/// The two independent sources a calendar page pulls from.
pub trait DataSource: Send + Sync + 'static {
    fn fetch_events(&self) -> impl Future<Output = Result<EventsResponse, FetchError>> + Send;
    fn fetch_battery(&self) -> impl Future<Output = Result<BatteryResponse, FetchError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_response_tolerates_missing_optional_fields() -> Result<(), serde_json::Error> {
        let response: EventsResponse =
            serde_json::from_str(r#"{"range_start":"a","range_end":"b","display_timezone":"Asia/Seoul"}"#)?;
        assert_eq!(response.display_timezone, "Asia/Seoul");
        assert!(response.week_start.is_none());
        assert!(response.occurrences.is_none());
        Ok(())
    }

    #[test]
    fn battery_response_rejects_non_numeric_percent() {
        let result: Result<BatteryResponse, _> = serde_json::from_str(r#"{"percent":"full"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn battery_response_ignores_extra_fields() -> Result<(), serde_json::Error> {
        let response: BatteryResponse =
            serde_json::from_str(r#"{"percent":64,"voltage_mv":3900}"#)?;
        assert_eq!(response.percent, Some(64.0));
        Ok(())
    }

    #[test]
    fn fetch_error_messages_are_stable() {
        assert_eq!(FetchError::HttpStatus(503).to_string(), "HTTP 503");
        assert_eq!(
            FetchError::Network("refused".to_string()).to_string(),
            "network failure: refused"
        );
    }
}
