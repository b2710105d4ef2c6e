use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::gate::Authorized;
use crate::auth::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// The principal admitted by the route gate.
/// Only available on routes behind `require_role`; elsewhere the request is
/// sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authorized>()
            .map(|a| CurrentPrincipal(a.0.clone()))
            .ok_or(AppError::Unauthorized)
    }
}

/// Stored principal, if any, for public pages.
pub struct MaybePrincipal(pub Option<Principal>);

impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(state.principals.principal()?))
    }
}
