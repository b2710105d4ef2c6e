//! Route authorization gate.
//!
//! `authorize` is a pure decision. The `require_role` middleware wraps every
//! protected route, re-reads the stored principal on each request and turns a
//! `Deny` into a redirect to the login page. Absence of a principal and a role
//! mismatch are indistinguishable to the caller.

use std::collections::{BTreeSet, HashMap};

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::role::{Role, UnknownRole};
use crate::auth::session::Principal;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Non-empty set of roles allowed to render a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new<I>(roles: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = Role>,
    {
        let set: BTreeSet<Role> = roles.into_iter().collect();
        if set.is_empty() {
            return Err(RouteTableError::EmptyRoleSet(String::new()));
        }
        Ok(Self(set))
    }

    /// Build from role names in any casing.
    pub fn parse<I, S>(names: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles = names
            .into_iter()
            .map(|name| name.as_ref().parse::<Role>())
            .collect::<Result<Vec<_>, UnknownRole>>()?;
        Self::new(roles)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteTableError {
    #[error("route {0:?} has an empty role set")]
    EmptyRoleSet(String),

    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    #[error("route {0:?} is registered twice")]
    Duplicate(String),
}

/// Decide whether `principal` may render a route guarded by `required`.
pub fn authorize(principal: Option<&Principal>, required: &RoleSet) -> Decision {
    match principal.and_then(|p| p.role) {
        Some(role) if required.contains(role) => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// Path → allowed roles, validated at registration time.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: HashMap<String, RoleSet>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect<I, S>(mut self, path: &str, roles: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = RoleSet::parse(roles).map_err(|e| match e {
            RouteTableError::EmptyRoleSet(_) => RouteTableError::EmptyRoleSet(path.to_string()),
            other => other,
        })?;
        if self.rules.insert(path.to_string(), set).is_some() {
            return Err(RouteTableError::Duplicate(path.to_string()));
        }
        Ok(self)
    }

    pub fn rule(&self, path: &str) -> Option<&RoleSet> {
        self.rules.get(path)
    }

    /// Unknown paths are denied.
    pub fn decide(&self, path: &str, principal: Option<&Principal>) -> Decision {
        match self.rule(path) {
            Some(required) => authorize(principal, required),
            None => Decision::Deny,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The dashboard routes of the attendance client.
    pub fn standard() -> Result<Self, RouteTableError> {
        Self::new()
            .protect("/admin", ["ADMIN"])?
            .protect("/admin/classes", ["ADMIN"])?
            .protect("/admin/students", ["ADMIN"])?
            .protect("/admin/teachers", ["ADMIN"])?
            .protect("/admin/analytics", ["ADMIN"])?
            .protect("/teacher", ["TEACHER"])?
            .protect("/teacher/take-attendance", ["TEACHER"])?
            .protect("/teacher/reports", ["TEACHER"])?
            .protect("/teacher/reports/daily", ["TEACHER"])?
            .protect("/teacher/reports/daily.csv", ["TEACHER"])?
            .protect("/teacher/reports/monthly", ["TEACHER"])?
            .protect("/teacher/reports/defaulters.csv", ["TEACHER"])?
            .protect("/teacher/students/{id}", ["TEACHER"])?
            .protect("/student", ["STUDENT"])?
            .protect("/student/attendance", ["STUDENT"])
    }
}

/// The principal that passed the gate for this request.
#[derive(Debug, Clone)]
pub struct Authorized(pub Principal);

/// Middleware for protected routers; install with `route_layer` so the
/// matched route template is available.
pub async fn require_role(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let principal = match state.principals.principal() {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Could not read login state: {}", e);
            None
        }
    };

    match state.routes.decide(&path, principal.as_ref()) {
        Decision::Allow => {
            if let Some(principal) = principal {
                req.extensions_mut().insert(Authorized(principal));
            }
            next.run(req).await
        }
        Decision::Deny => {
            tracing::debug!(%path, "Gate denied navigation");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Option<Role>) -> Principal {
        Principal {
            id: 1,
            name: "n".into(),
            email: "e@x".into(),
            role,
        }
    }

    fn roles(names: &[&str]) -> RoleSet {
        RoleSet::parse(names).unwrap()
    }

    #[test]
    fn allows_matching_role() {
        let p = principal(Some(Role::Teacher));
        assert_eq!(authorize(Some(&p), &roles(&["TEACHER"])), Decision::Allow);
        assert_eq!(
            authorize(Some(&p), &roles(&["admin", "teacher"])),
            Decision::Allow
        );
    }

    #[test]
    fn required_roles_are_case_insensitive() {
        let p: Principal = serde_json::from_str(r#"{"id":1,"role":"Admin"}"#).unwrap();
        assert_eq!(authorize(Some(&p), &roles(&["aDmIn"])), Decision::Allow);
    }

    #[test]
    fn denies_every_mismatch() {
        let all = [Role::Admin, Role::Teacher, Role::Student];
        for have in all {
            for want in all.iter().filter(|r| **r != have) {
                let p = principal(Some(have));
                let set = RoleSet::new([*want]).unwrap();
                assert_eq!(authorize(Some(&p), &set), Decision::Deny);
            }
        }
    }

    #[test]
    fn denies_missing_role() {
        let p = principal(None);
        assert_eq!(authorize(Some(&p), &roles(&["STUDENT"])), Decision::Deny);
    }

    #[test]
    fn denies_without_principal() {
        for set in [
            roles(&["ADMIN"]),
            roles(&["TEACHER"]),
            roles(&["ADMIN", "TEACHER", "STUDENT"]),
        ] {
            assert_eq!(authorize(None, &set), Decision::Deny);
        }
    }

    #[test]
    fn empty_role_set_rejected_at_registration() {
        let empty: [&str; 0] = [];
        let err = RouteTable::new().protect("/admin", empty).unwrap_err();
        assert_eq!(err, RouteTableError::EmptyRoleSet("/admin".into()));
    }

    #[test]
    fn unknown_role_rejected_at_registration() {
        let err = RouteTable::new().protect("/x", ["wizard"]).unwrap_err();
        assert!(matches!(err, RouteTableError::UnknownRole(_)));
    }

    #[test]
    fn duplicate_route_rejected() {
        let err = RouteTable::new()
            .protect("/admin", ["ADMIN"])
            .unwrap()
            .protect("/admin", ["TEACHER"])
            .unwrap_err();
        assert_eq!(err, RouteTableError::Duplicate("/admin".into()));
    }

    #[test]
    fn unregistered_path_is_denied() {
        let table = RouteTable::standard().unwrap();
        let p = principal(Some(Role::Admin));
        assert_eq!(table.decide("/admin/secret", Some(&p)), Decision::Deny);
    }

    #[test]
    fn standard_table_routes_each_role_home() {
        let table = RouteTable::standard().unwrap();
        for role in [Role::Admin, Role::Teacher, Role::Student] {
            let p = principal(Some(role));
            assert_eq!(table.decide(role.home_path(), Some(&p)), Decision::Allow);
        }
        let student = principal(Some(Role::Student));
        assert_eq!(
            table.decide("/teacher/take-attendance", Some(&student)),
            Decision::Deny
        );
    }

    #[test]
    fn parameterised_routes_are_keyed_by_template() {
        let table = RouteTable::standard().unwrap();
        let teacher = principal(Some(Role::Teacher));
        let student = principal(Some(Role::Student));
        assert_eq!(
            table.decide("/teacher/students/{id}", Some(&teacher)),
            Decision::Allow
        );
        assert_eq!(
            table.decide("/teacher/students/{id}", Some(&student)),
            Decision::Deny
        );
        // Concrete paths only match through the router's matched template
        assert_eq!(
            table.decide("/teacher/students/2", Some(&teacher)),
            Decision::Deny
        );
    }
}
