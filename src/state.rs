use crate::battery::clamp_percent;
use crate::grid::WeekStart;
use crate::occurrence::OccurrenceIndex;
use crate::readiness::{ReadinessCoordinator, ReadinessRule, Settlement, Source};
use crate::source::{BatteryResponse, EventsResponse, FetchError};
use crate::zone::ViewerZone;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Mutable state of one mounted calendar page.
///
/// Only [`PageState::apply_events`] and [`PageState::apply_battery`] change
/// it, and each settles its source exactly once.
#[derive(Debug)]
pub struct PageState {
    reference: OffsetDateTime,
    zone: ViewerZone,
    week_start: WeekStart,
    display_timezone: String,
    last_updated_at: Option<OffsetDateTime>,
    events_error: Option<FetchError>,
    index: OccurrenceIndex,
    battery_percent: Option<f64>,
    readiness: ReadinessCoordinator,
}

impl PageState {
    pub fn new(
        reference: OffsetDateTime,
        zone: impl Into<ViewerZone>,
        display_timezone: impl Into<String>,
        rule: ReadinessRule,
    ) -> Self {
        let zone = zone.into();
        Self {
            reference: zone.local(reference),
            zone,
            week_start: WeekStart::default(),
            display_timezone: display_timezone.into(),
            last_updated_at: None,
            events_error: None,
            index: OccurrenceIndex::default(),
            battery_percent: None,
            readiness: ReadinessCoordinator::new(rule),
        }
    }

    pub fn reference(&self) -> OffsetDateTime {
        self.reference
    }

    pub fn zone(&self) -> ViewerZone {
        self.zone
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn display_timezone(&self) -> &str {
        &self.display_timezone
    }

    pub fn last_updated_at(&self) -> Option<OffsetDateTime> {
        self.last_updated_at
    }

    pub fn events_error(&self) -> Option<&FetchError> {
        self.events_error.as_ref()
    }

    pub fn index(&self) -> &OccurrenceIndex {
        &self.index
    }

    pub fn battery_percent(&self) -> Option<f64> {
        self.battery_percent
    }

    pub fn readiness(&self) -> &ReadinessCoordinator {
        &self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.readiness.subscribe()
    }

    /// Applies the events fetch outcome. On failure the previous index is kept.
    pub fn apply_events(
        &mut self,
        result: Result<EventsResponse, FetchError>,
        completed_at: OffsetDateTime,
    ) {
        if self.readiness.state().events.is_settled() {
            warn!("Events source already settled, dropping result");
            return;
        }

        let settlement = match result {
            Ok(response) => {
                self.week_start = WeekStart::from_api(response.week_start.as_deref());
                if !response.display_timezone.is_empty() {
                    self.display_timezone = response.display_timezone;
                }
                let occurrences = response.occurrences.unwrap_or_default();
                self.index = OccurrenceIndex::build(occurrences, self.zone);
                self.last_updated_at = Some(self.zone.local(completed_at));
                self.events_error = None;
                info!(
                    occurrences = self.index.len(),
                    week_start = ?self.week_start,
                    "Events loaded"
                );
                Settlement::Succeeded
            }
            Err(err) => {
                warn!(error = %err, "Events fetch failed, keeping previous index");
                self.events_error = Some(err);
                Settlement::Failed
            }
        };
        self.readiness.settle(Source::Events, settlement);
    }

    /// Applies the battery fetch outcome. Failures leave the percent unknown.
    pub fn apply_battery(&mut self, result: Result<BatteryResponse, FetchError>) {
        if self.readiness.state().battery.is_settled() {
            warn!("Battery source already settled, dropping result");
            return;
        }

        let settlement = match result {
            Ok(response) => {
                if let Some(percent) = response.percent.and_then(clamp_percent) {
                    self.battery_percent = Some(percent);
                }
                debug!(percent = ?self.battery_percent, "Battery loaded");
                Settlement::Succeeded
            }
            Err(err) => {
                debug!(error = %err, "Battery fetch failed");
                Settlement::Failed
            }
        };
        self.readiness.settle(Source::Battery, settlement);
    }
}
