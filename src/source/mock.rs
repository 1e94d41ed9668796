use crate::source::{BatteryResponse, DataSource, EventsResponse, FetchError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Scripted source for tests and demos.
///
/// A gate holds the corresponding reply until `notify_one` is called on it,
/// which lets callers choose which fetch settles first.
#[derive(Debug)]
pub struct MockSource {
    events: Result<EventsResponse, FetchError>,
    battery: Result<BatteryResponse, FetchError>,
    events_gate: Option<Arc<Notify>>,
    battery_gate: Option<Arc<Notify>>,
    events_calls: AtomicUsize,
    battery_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(
        events: Result<EventsResponse, FetchError>,
        battery: Result<BatteryResponse, FetchError>,
    ) -> Self {
        Self {
            events,
            battery,
            events_gate: None,
            battery_gate: None,
            events_calls: AtomicUsize::new(0),
            battery_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_events_gate(mut self, gate: Arc<Notify>) -> Self {
        self.events_gate = Some(gate);
        self
    }

    pub fn with_battery_gate(mut self, gate: Arc<Notify>) -> Self {
        self.battery_gate = Some(gate);
        self
    }

    pub fn events_calls(&self) -> usize {
        self.events_calls.load(Ordering::SeqCst)
    }

    pub fn battery_calls(&self) -> usize {
        self.battery_calls.load(Ordering::SeqCst)
    }
}

impl DataSource for MockSource {
    async fn fetch_events(&self) -> Result<EventsResponse, FetchError> {
        self.events_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.events_gate {
            gate.notified().await;
        }
        self.events.clone()
    }

    async fn fetch_battery(&self) -> Result<BatteryResponse, FetchError> {
        self.battery_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.battery_gate {
            gate.notified().await;
        }
        self.battery.clone()
    }
}
