//! Aggregates settlement of the page's data sources into the single
//! capture-readiness bit polled by the external capture tool.
//!
//! Each source moves `Pending → Succeeded` or `Pending → Failed` exactly
//! once. Readiness is raised when the configured rule is satisfied and is
//! never lowered again for the lifetime of the coordinator.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Pending,
    Succeeded,
    Failed,
}

impl SourceState {
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Events,
    Battery,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Battery => "battery",
        }
    }
}

/// Terminal outcome of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Succeeded,
    Failed,
}

impl From<Settlement> for SourceState {
    fn from(settlement: Settlement) -> Self {
        match settlement {
            Settlement::Succeeded => SourceState::Succeeded,
            Settlement::Failed => SourceState::Failed,
        }
    }
}

/// Which sources must settle before the page is capturable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessRule {
    #[default]
    AllSources,
    EventsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadinessState {
    pub events: SourceState,
    pub battery: SourceState,
}

impl ReadinessState {
    fn pending() -> Self {
        Self {
            events: SourceState::Pending,
            battery: SourceState::Pending,
        }
    }

    pub fn get(&self, source: Source) -> SourceState {
        match source {
            Source::Events => self.events,
            Source::Battery => self.battery,
        }
    }

    fn slot(&mut self, source: Source) -> &mut SourceState {
        match source {
            Source::Events => &mut self.events,
            Source::Battery => &mut self.battery,
        }
    }

    pub fn satisfies(&self, rule: ReadinessRule) -> bool {
        match rule {
            ReadinessRule::AllSources => self.events.is_settled() && self.battery.is_settled(),
            ReadinessRule::EventsOnly => self.events.is_settled(),
        }
    }
}

#[derive(Debug)]
pub struct ReadinessCoordinator {
    state: ReadinessState,
    rule: ReadinessRule,
    ready_tx: watch::Sender<bool>,
}

impl ReadinessCoordinator {
    pub fn new(rule: ReadinessRule) -> Self {
        let (ready_tx, _ready_rx) = watch::channel(false);
        Self {
            state: ReadinessState::pending(),
            rule,
            ready_tx,
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn rule(&self) -> ReadinessRule {
        self.rule
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    /// Records the outcome of `source`. Returns `false` if the source had
    /// already settled, in which case nothing changes.
    pub fn settle(&mut self, source: Source, settlement: Settlement) -> bool {
        let slot = self.state.slot(source);
        if slot.is_settled() {
            warn!(
                source = source.as_str(),
                state = ?*slot,
                "Ignoring repeated settlement"
            );
            return false;
        }
        *slot = settlement.into();

        if self.state.satisfies(self.rule) {
            let raised = self.ready_tx.send_if_modified(|ready| {
                if *ready {
                    false
                } else {
                    *ready = true;
                    true
                }
            });
            if raised {
                info!(
                    events = ?self.state.events,
                    battery = ?self.state.battery,
                    "Page ready for capture"
                );
            }
        }
        true
    }
}
