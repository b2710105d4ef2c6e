use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::extractors::MaybePrincipal;
use crate::routes::view::{Nav, Toast};

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub toast: Option<Toast>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(maybe: MaybePrincipal) -> Response {
    // Logged in with a known role: go to that role's dashboard
    if let Some(role) = maybe.0.and_then(|p| p.role) {
        return Redirect::to(role.home_path()).into_response();
    }

    Html(HomeTemplate {
        nav: Nav::anonymous(),
        toast: None,
    })
    .into_response()
}
