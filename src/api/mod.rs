use crate::config::BasicAuth;
use crate::source::DataSource;
use crate::view::CalendarView;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;

pub mod auth;
pub mod handlers;
pub mod responses;

/// Builds the service router. `/health` always stays outside basic auth.
pub fn router<S: DataSource>(view: Arc<CalendarView<S>>, basic_auth: Option<BasicAuth>) -> Router {
    let calendar = Router::new()
        .route("/calendar", get(handlers::get_calendar::<S>))
        .route("/calendar/ready", get(handlers::get_ready::<S>))
        .route("/calendar/reload", post(handlers::post_reload::<S>))
        .with_state(view);

    let calendar = match basic_auth {
        Some(credentials) => calendar.layer(middleware::from_fn_with_state(
            Arc::new(credentials),
            auth::require_basic_auth,
        )),
        None => calendar,
    };

    Router::new()
        .route("/health", get(handlers::get_health))
        .merge(calendar)
}
