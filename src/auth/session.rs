//! Persistent login state: the bearer token and the principal it belongs to.
//!
//! Both live in a single `auth_state` row. They are saved by one statement and
//! cleared by one statement, so the store never holds a token without an
//! identity or an identity without a token.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::auth::role::{self, Role};
use crate::state::DbPool;

/// The authenticated actor as reported by the backend at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "role::deserialize_lenient")]
    pub role: Option<Role>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Single accessor for the process-wide login state.
#[derive(Clone)]
pub struct PrincipalStore {
    db: DbPool,
}

impl PrincipalStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Record a successful login, replacing whatever was stored before.
    pub fn save(&self, token: &str, principal: &Principal) -> Result<(), StoreError> {
        let json = serde_json::to_string(principal)?;
        let conn = self.db.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO auth_state (id, token, principal_json, saved_at) \
             VALUES (1, ?1, ?2, datetime('now'))",
            params![token, json],
        )?;
        tracing::info!(principal_id = principal.id, "Stored login state");
        Ok(())
    }

    /// Current principal, if any. A row that no longer parses is treated as
    /// logged out rather than as an error.
    pub fn principal(&self) -> Result<Option<Principal>, StoreError> {
        let conn = self.db.get()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT principal_json FROM auth_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::warn!("Stored principal is unreadable: {}", e);
                None
            }
        }))
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        let conn = self.db.get()?;
        let token = conn
            .query_row("SELECT token FROM auth_state WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(token)
    }

    /// Forget the token and principal together.
    pub fn clear(&self) -> Result<(), StoreError> {
        let conn = self.db.get()?;
        let removed = conn.execute("DELETE FROM auth_state", [])?;
        if removed > 0 {
            tracing::info!("Cleared login state");
        }
        Ok(())
    }
}
