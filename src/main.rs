use epdcal_view::config::{self, Settings};
use epdcal_view::source::http::HttpSource;
use epdcal_view::view::{CalendarView, spawn_remount_loop};
use epdcal_view::{api, error::AppError};
use std::net::SocketAddr;
use std::sync::Arc;
use time::OffsetDateTime;

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    // Tracing first so host timezone detection can report a fallback.
    init_tracing(config.log_level()?);
    let settings = config.resolve()?;
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %settings.app_name,
        "epdcal-view starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(settings))?;
    Ok(())
}

async fn run(settings: Settings) -> Result<(), AppError> {
    let source = Arc::new(HttpSource::new(
        settings.backend_url.clone(),
        settings.request_timeout,
        settings.basic_auth.clone(),
    )?);
    tracing::info!(
        backend = %settings.backend_url,
        zone = %settings.view.zone,
        locale = settings.view.default_locale.tag(),
        readiness = ?settings.view.readiness,
        "Data sources configured"
    );

    let view = Arc::new(CalendarView::new(
        source,
        settings.view.clone(),
        OffsetDateTime::now_utc(),
    ));

    let _remount_handle = match settings.remount_interval {
        Some(interval) => Some(spawn_remount_loop(Arc::clone(&view), interval)),
        None => {
            tracing::info!("Periodic remount disabled");
            None
        }
    };

    if settings.basic_auth.is_none() {
        tracing::warn!("Basic auth not configured, calendar routes are open");
    }
    let app = api::router(view, settings.basic_auth);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
