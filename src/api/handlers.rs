use crate::api::responses::{ErrorCode, ErrorResponse, ReadinessResponse, ReloadResponse};
use crate::error::AppError;
use crate::locale::Locale;
use crate::source::DataSource;
use crate::view::CalendarView;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub lang: Option<String>,
    /// Page to resume; set by the pending page's refresh.
    pub instance: Option<u64>,
}

pub enum CalendarResponse {
    Page(String),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for CalendarResponse {
    fn into_response(self) -> Response {
        match self {
            CalendarResponse::Page(html) => (StatusCode::OK, Html(html)).into_response(),
            CalendarResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub enum ReadyResponse {
    Success(ReadinessResponse),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for ReadyResponse {
    fn into_response(self) -> Response {
        match self {
            ReadyResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ReadyResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub enum ReloadResult {
    Accepted(ReloadResponse),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for ReloadResult {
    fn into_response(self) -> Response {
        match self {
            ReloadResult::Accepted(body) => (StatusCode::ACCEPTED, Json(body)).into_response(),
            ReloadResult::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health() -> &'static str {
    "OK"
}

pub async fn get_calendar<S: DataSource>(
    State(view): State<Arc<CalendarView<S>>>,
    Query(query): Query<CalendarQuery>,
) -> impl IntoResponse {
    build_calendar_response(&view, &query, OffsetDateTime::now_utc()).await
}

pub async fn get_ready<S: DataSource>(
    State(view): State<Arc<CalendarView<S>>>,
) -> impl IntoResponse {
    build_ready_response(&view)
}

pub async fn post_reload<S: DataSource>(
    State(view): State<Arc<CalendarView<S>>>,
) -> impl IntoResponse {
    build_reload_response(&view, OffsetDateTime::now_utc())
}

async fn build_calendar_response<S: DataSource>(
    view: &CalendarView<S>,
    query: &CalendarQuery,
    now: OffsetDateTime,
) -> CalendarResponse {
    let locale = Locale::resolve(query.lang.as_deref(), view.options().default_locale);
    match render_navigation(view, query.instance, locale, now).await {
        Ok(html) => CalendarResponse::Page(html),
        Err(err) => {
            let (status, body) = internal_error("/calendar", &err);
            CalendarResponse::Error { status, body }
        }
    }
}

/// Holds the response until the page settles or `render_wait` runs out.
/// A page served early carries a refresh back to its own instance.
async fn render_navigation<S: DataSource>(
    view: &CalendarView<S>,
    instance: Option<u64>,
    locale: Locale,
    now: OffsetDateTime,
) -> Result<String, AppError> {
    let page = view.navigate(instance, now)?;
    if !page.wait_ready_for(view.options().render_wait).await? {
        warn!(instance = page.id(), "Serving calendar before data settled");
    }
    page.render(locale)
}

fn build_ready_response<S: DataSource>(view: &CalendarView<S>) -> ReadyResponse {
    let snapshot = view.current().and_then(|page| {
        page.with_state(|state| ReadinessResponse {
            ready: state.is_ready(),
            instance: page.id(),
            events: state.readiness().state().events,
            battery: state.readiness().state().battery,
        })
    });
    match snapshot {
        Ok(body) => ReadyResponse::Success(body),
        Err(err) => {
            let (status, body) = internal_error("/calendar/ready", &err);
            ReadyResponse::Error { status, body }
        }
    }
}

fn build_reload_response<S: DataSource>(view: &CalendarView<S>, now: OffsetDateTime) -> ReloadResult {
    match view.remount(now) {
        Ok(page) => {
            info!(instance = page.id(), "Reload requested");
            ReloadResult::Accepted(ReloadResponse { instance: page.id() })
        }
        Err(err) => {
            let (status, body) = internal_error("/calendar/reload", &err);
            ReloadResult::Error { status, body }
        }
    }
}

fn internal_error(route: &'static str, err: &AppError) -> (StatusCode, ErrorResponse) {
    error!(route, error = %err, "Internal error while handling request");
    let timestamp = format_timestamp(OffsetDateTime::now_utc()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        "1970-01-01T00:00:00Z".to_string()
    });
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp,
        },
    )
}

fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, AppError> {
    Ok(timestamp.format(&Rfc3339)?)
}
