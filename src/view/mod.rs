//! The calendar page: mounting, fetch orchestration and the current
//! instance served over HTTP.

use crate::error::AppError;
use crate::locale::Locale;
use crate::readiness::{ReadinessRule, ReadinessState, Source};
use crate::source::DataSource;
use crate::state::PageState;
use crate::zone::ViewerZone;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub mod page;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub default_locale: Locale,
    pub zone: ViewerZone,
    pub display_timezone: String,
    pub readiness: ReadinessRule,
    /// Upper bound on holding a navigation until the page is ready.
    pub render_wait: Duration,
}

/// One mounted page. Dropping it tears the page down: the fetch task is
/// aborted, and a settlement racing the abort is discarded.
#[derive(Debug)]
pub struct PageInstance {
    id: u64,
    state: Arc<RwLock<PageState>>,
    fetches: JoinHandle<()>,
}

impl PageInstance {
    /// Mounts a page and starts both fetches concurrently on one task.
    pub fn mount<S: DataSource>(
        id: u64,
        source: Arc<S>,
        options: &ViewOptions,
        now: OffsetDateTime,
    ) -> Self {
        let state = Arc::new(RwLock::new(PageState::new(
            now,
            options.zone,
            options.display_timezone.clone(),
            options.readiness,
        )));
        info!(instance = id, "Mounting calendar page");
        let fetches = tokio::spawn(run_fetches(id, source, Arc::downgrade(&state)));
        Self { id, state, fetches }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn with_state<T>(&self, read: impl FnOnce(&PageState) -> T) -> Result<T, AppError> {
        let guard = self.state.read().map_err(|_| AppError::StateLock)?;
        Ok(read(&guard))
    }

    pub fn is_ready(&self) -> Result<bool, AppError> {
        self.with_state(PageState::is_ready)
    }

    pub fn readiness(&self) -> Result<ReadinessState, AppError> {
        self.with_state(|state| state.readiness().state())
    }

    pub fn subscribe_ready(&self) -> Result<watch::Receiver<bool>, AppError> {
        self.with_state(PageState::subscribe_ready)
    }

    pub async fn wait_until_ready(&self) -> Result<(), AppError> {
        let mut receiver = self.subscribe_ready()?;
        receiver
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| AppError::ReadinessClosed)?;
        Ok(())
    }

    /// Waits up to `limit` for readiness. Returns whether the page is ready.
    pub async fn wait_ready_for(&self, limit: Duration) -> Result<bool, AppError> {
        match tokio::time::timeout(limit, self.wait_until_ready()).await {
            Ok(result) => result.map(|()| true),
            Err(_) => Ok(false),
        }
    }

    /// Renders the page DOM for `locale`. Marker and content come from the
    /// same snapshot.
    pub fn render(&self, locale: Locale) -> Result<String, AppError> {
        let guard = self.state.read().map_err(|_| AppError::StateLock)?;
        page::render(&guard, locale, self.id)
    }

    #[cfg(test)]
    fn fetch_task(&self) -> tokio::task::AbortHandle {
        self.fetches.abort_handle()
    }
}

impl Drop for PageInstance {
    fn drop(&mut self) {
        if !self.fetches.is_finished() {
            debug!(instance = self.id, "Aborting in-flight fetches");
            self.fetches.abort();
        }
    }
}

async fn run_fetches<S: DataSource>(id: u64, source: Arc<S>, state: Weak<RwLock<PageState>>) {
    let events = async {
        let result = source.fetch_events().await;
        apply_if_mounted(id, &state, Source::Events, |page| {
            page.apply_events(result, OffsetDateTime::now_utc())
        });
    };
    let battery = async {
        let result = source.fetch_battery().await;
        apply_if_mounted(id, &state, Source::Battery, |page| page.apply_battery(result));
    };
    tokio::join!(events, battery);
}

fn apply_if_mounted(
    id: u64,
    state: &Weak<RwLock<PageState>>,
    source: Source,
    update: impl FnOnce(&mut PageState),
) {
    let Some(state) = state.upgrade() else {
        debug!(
            instance = id,
            source = source.as_str(),
            "Page torn down, discarding settlement"
        );
        return;
    };
    match state.write() {
        Ok(mut guard) => update(&mut guard),
        Err(_) => error!(
            instance = id,
            source = source.as_str(),
            "Page state lock poisoned, settlement lost"
        ),
    }
}

/// Holds the data source and the currently mounted page.
#[derive(Debug)]
pub struct CalendarView<S> {
    source: Arc<S>,
    options: ViewOptions,
    current: RwLock<Arc<PageInstance>>,
    next_id: AtomicU64,
}

impl<S: DataSource> CalendarView<S> {
    /// Creates the view and mounts its first page at `now`.
    pub fn new(source: Arc<S>, options: ViewOptions, now: OffsetDateTime) -> Self {
        let first = PageInstance::mount(1, Arc::clone(&source), &options, now);
        Self {
            source,
            options,
            current: RwLock::new(Arc::new(first)),
            next_id: AtomicU64::new(2),
        }
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn current(&self) -> Result<Arc<PageInstance>, AppError> {
        let guard = self.current.read().map_err(|_| AppError::ViewLock)?;
        Ok(Arc::clone(&guard))
    }

    /// A navigation to the calendar. `instance` resumes the current page
    /// when it names it; anything else is a fresh page load.
    pub fn navigate(
        &self,
        instance: Option<u64>,
        now: OffsetDateTime,
    ) -> Result<Arc<PageInstance>, AppError> {
        if let Some(requested) = instance {
            let current = self.current()?;
            if current.id() == requested {
                return Ok(current);
            }
            debug!(
                requested,
                current = current.id(),
                "Requested page is gone, loading a fresh one"
            );
        }
        self.remount(now)
    }

    /// Replaces the current page with a freshly mounted one.
    pub fn remount(&self, now: OffsetDateTime) -> Result<Arc<PageInstance>, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let instance = Arc::new(PageInstance::mount(
            id,
            Arc::clone(&self.source),
            &self.options,
            now,
        ));
        let previous = {
            let mut guard = self.current.write().map_err(|_| AppError::ViewLock)?;
            std::mem::replace(&mut *guard, Arc::clone(&instance))
        };
        info!(previous = previous.id(), current = id, "Calendar page remounted");
        Ok(instance)
    }
}

/// Remounts the page every `interval`, like a periodic browser reload.
pub fn spawn_remount_loop<S: DataSource>(
    view: Arc<CalendarView<S>>,
    interval: Duration,
) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Starting remount loop");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = view.remount(OffsetDateTime::now_utc()) {
                warn!(error = %err, "Periodic remount failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::SourceState;
    use crate::source::mock::MockSource;
    use crate::source::{BatteryResponse, EventsResponse, FetchError};
    use time::macros::{datetime, offset};
    use tokio::sync::Notify;

    fn options(rule: ReadinessRule) -> ViewOptions {
        ViewOptions {
            default_locale: Locale::En,
            zone: offset!(UTC).into(),
            display_timezone: "UTC".to_string(),
            readiness: rule,
            render_wait: Duration::from_secs(5),
        }
    }

    fn ok_events() -> Result<EventsResponse, FetchError> {
        Ok(EventsResponse {
            display_timezone: "Asia/Seoul".to_string(),
            week_start: Some("sunday".to_string()),
            occurrences: Some(Vec::new()),
            ..EventsResponse::default()
        })
    }

    #[tokio::test]
    async fn both_sources_are_fetched_once_and_page_becomes_ready() -> Result<(), AppError> {
        let source = Arc::new(MockSource::new(
            ok_events(),
            Ok(BatteryResponse { percent: Some(55.0) }),
        ));
        let view = CalendarView::new(
            Arc::clone(&source),
            options(ReadinessRule::AllSources),
            datetime!(2024-03-14 09:00 UTC),
        );
        let page = view.current()?;

        page.wait_until_ready().await?;

        assert_eq!(source.events_calls(), 1);
        assert_eq!(source.battery_calls(), 1);
        assert_eq!(page.with_state(|s| s.battery_percent())?, Some(55.0));
        assert_eq!(page.with_state(|s| s.display_timezone().to_string())?, "Asia/Seoul");
        Ok(())
    }

    #[tokio::test]
    async fn readiness_waits_for_held_battery_fetch() -> Result<(), AppError> {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(
            MockSource::new(ok_events(), Err(FetchError::HttpStatus(500)))
                .with_battery_gate(Arc::clone(&gate)),
        );
        let page = PageInstance::mount(
            7,
            source,
            &options(ReadinessRule::AllSources),
            datetime!(2024-03-14 09:00 UTC),
        );

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(page.readiness()?.events, SourceState::Succeeded);
        assert_eq!(page.readiness()?.battery, SourceState::Pending);
        assert!(!page.is_ready()?);

        gate.notify_one();
        page.wait_until_ready().await?;
        assert_eq!(page.readiness()?.battery, SourceState::Failed);
        assert!(page.is_ready()?);
        Ok(())
    }

    #[tokio::test]
    async fn events_only_rule_does_not_wait_for_battery() -> Result<(), AppError> {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(
            MockSource::new(ok_events(), Ok(BatteryResponse::default()))
                .with_battery_gate(gate),
        );
        let page = PageInstance::mount(
            1,
            source,
            &options(ReadinessRule::EventsOnly),
            datetime!(2024-03-14 09:00 UTC),
        );

        page.wait_until_ready().await?;
        assert_eq!(page.readiness()?.battery, SourceState::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn torn_down_page_discards_late_settlement() -> Result<(), AppError> {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(
            MockSource::new(ok_events(), Ok(BatteryResponse::default()))
                .with_events_gate(Arc::clone(&gate)),
        );
        let page = PageInstance::mount(
            3,
            Arc::clone(&source),
            &options(ReadinessRule::AllSources),
            datetime!(2024-03-14 09:00 UTC),
        );
        let receiver = page.subscribe_ready()?;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(source.events_calls(), 1);

        let fetches = page.fetch_task();
        assert!(!fetches.is_finished());
        drop(page);

        gate.notify_one();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(fetches.is_finished());
        assert_eq!(source.events_calls(), 1);
        assert!(!*receiver.borrow());
        assert!(receiver.has_changed().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn navigation_resumes_named_instance_and_reloads_otherwise() -> Result<(), AppError> {
        let source = Arc::new(MockSource::new(ok_events(), Ok(BatteryResponse::default())));
        let view = CalendarView::new(
            Arc::clone(&source),
            options(ReadinessRule::AllSources),
            datetime!(2024-03-14 23:59 UTC),
        );

        let resumed = view.navigate(Some(1), datetime!(2024-03-15 00:01 UTC))?;
        assert_eq!(resumed.id(), 1);

        let fresh = view.navigate(None, datetime!(2024-03-15 00:01 UTC))?;
        assert_eq!(fresh.id(), 2);
        assert_eq!(
            fresh.with_state(|s| s.reference())?,
            datetime!(2024-03-15 00:01 UTC)
        );

        let stale = view.navigate(Some(1), datetime!(2024-03-15 00:02 UTC))?;
        assert_eq!(stale.id(), 3);
        assert_eq!(view.current()?.id(), 3);

        stale.wait_until_ready().await?;
        assert!(source.events_calls() >= 1);
        Ok(())
    }

    #[tokio::test]
    async fn bounded_wait_reports_pending_page() -> Result<(), AppError> {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(
            MockSource::new(ok_events(), Ok(BatteryResponse::default()))
                .with_battery_gate(Arc::clone(&gate)),
        );
        let page = PageInstance::mount(
            4,
            source,
            &options(ReadinessRule::AllSources),
            datetime!(2024-03-14 09:00 UTC),
        );

        assert!(!page.wait_ready_for(Duration::from_millis(20)).await?);
        gate.notify_one();
        assert!(page.wait_ready_for(Duration::from_secs(5)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn remount_replaces_instance_and_refetches() -> Result<(), AppError> {
        let source = Arc::new(MockSource::new(ok_events(), Ok(BatteryResponse::default())));
        let view = CalendarView::new(
            Arc::clone(&source),
            options(ReadinessRule::AllSources),
            datetime!(2024-03-14 09:00 UTC),
        );
        let first = view.current()?;
        first.wait_until_ready().await?;

        let second = view.remount(datetime!(2024-03-14 09:15 UTC))?;
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(view.current()?.id(), 2);

        second.wait_until_ready().await?;
        assert_eq!(source.events_calls(), 2);
        assert!(first.is_ready()?);
        Ok(())
    }
}
