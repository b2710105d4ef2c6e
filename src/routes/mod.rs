pub mod admin;
pub mod assets;
pub mod attendance;
pub mod auth;
pub mod home;
pub mod reports;
pub mod student;
pub mod teacher;
pub mod view;

use std::str::FromStr;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::gate::require_role;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The complete application router.
pub fn app(state: AppState) -> Router {
    // Every dashboard route sits behind the role gate
    let protected = Router::new()
        .merge(admin::router())
        .merge(teacher::router())
        .merge(attendance::router())
        .merge(reports::router())
        .merge(student::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_role));

    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse an optional form or query value; blank counts as absent.
pub(crate) fn optional<T: FromStr>(raw: Option<&str>, what: &str) -> AppResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", what, value))),
    }
}
