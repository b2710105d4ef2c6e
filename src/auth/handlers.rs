use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::MaybePrincipal;
use crate::routes::home::Html;
use crate::routes::view::{Nav, Toast};
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub toast: Option<Toast>,
    pub email: String,
    pub error: Option<String>,
}

impl LoginTemplate {
    fn blank() -> Self {
        Self {
            nav: Nav::anonymous(),
            toast: None,
            email: String::new(),
            error: None,
        }
    }

    fn failed(email: String, error: String) -> Self {
        Self {
            error: Some(error),
            email,
            ..Self::blank()
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// -- Handlers --

/// Login page. An existing login with a known role skips straight to its
/// dashboard.
pub async fn login_page(maybe: MaybePrincipal) -> Response {
    if let Some(role) = maybe.0.and_then(|p| p.role) {
        return Redirect::to(role.home_path()).into_response();
    }
    Html(LoginTemplate::blank()).into_response()
}

/// Exchange credentials for a token, persist the principal and go to the
/// role's home.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let email = form.email.trim().to_string();
    if email.is_empty() || form.password.is_empty() {
        return Ok(Html(LoginTemplate::failed(
            email,
            "Email and password are required".to_string(),
        ))
        .into_response());
    }

    let data = match state.api.login(&email, &form.password).await {
        Ok(data) => data,
        Err(e) => {
            tracing::info!("Login failed for {}: {}", email, e);
            return Ok(Html(LoginTemplate::failed(email, e.user_message())).into_response());
        }
    };

    let Some(role) = data.user.role else {
        tracing::warn!(user_id = data.user.id, "Login returned no usable role");
        return Ok(Html(LoginTemplate::failed(
            email,
            "This account has no recognised role".to_string(),
        ))
        .into_response());
    };

    state.principals.save(&data.access_token, &data.user)?;
    tracing::info!(user_id = data.user.id, %role, "Logged in");

    Ok(Redirect::to(role.home_path()).into_response())
}

pub async fn logout(State(state): State<AppState>) -> AppResult<Response> {
    state.principals.clear()?;
    tracing::info!("Logged out");
    Ok(Redirect::to("/").into_response())
}
