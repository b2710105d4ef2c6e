//! Attendance session reconciliation.
//!
//! Makes sure exactly one session exists for a class and date and that its
//! records match a submitted draft. Creation is attempted first; a conflict
//! means another submission already created the session, so it is looked up
//! by class and date and reused. Success is reported only once the records
//! upsert has been accepted.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::types::{NewSession, RecordInput, SessionSummary};
use crate::api::{ApiClient, ApiError};
use crate::attendance::draft::Draft;

/// Natural key of an attendance session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub class_id: i64,
    pub session_date: NaiveDate,
}

impl SessionKey {
    pub fn new(class_id: i64, session_date: NaiveDate) -> Self {
        Self {
            class_id,
            session_date,
        }
    }

    fn matches(&self, session: &SessionSummary) -> bool {
        session.class_id == self.class_id && session.session_date == self.session_date
    }
}

/// The three backend calls reconciliation depends on.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Returns the new session id; a 409 status when it already exists.
    async fn create_session(&self, body: &NewSession) -> Result<i64, ApiError>;

    /// Sessions of `class_id` near `date`; may include other dates.
    async fn list_sessions(
        &self,
        class_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<SessionSummary>, ApiError>;

    /// Replace the session's records.
    async fn put_records(&self, session_id: i64, records: &[RecordInput]) -> Result<(), ApiError>;
}

#[async_trait]
impl SessionBackend for ApiClient {
    async fn create_session(&self, body: &NewSession) -> Result<i64, ApiError> {
        ApiClient::create_session(self, body).await
    }

    async fn list_sessions(
        &self,
        class_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<SessionSummary>, ApiError> {
        ApiClient::list_sessions(self, class_id, date).await
    }

    async fn put_records(&self, session_id: i64, records: &[RecordInput]) -> Result<(), ApiError> {
        ApiClient::put_records(self, session_id, records).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The session could neither be created nor resolved.
    #[error("Could not create attendance session: {0}")]
    Create(#[source] ApiError),

    /// Creation reported a conflict but no matching session was found.
    #[error("Attendance session for class {} on {} exists but could not be found", .key.class_id, .key.session_date)]
    Inconsistent { key: SessionKey },

    #[error("Could not save attendance for session {session_id}: {source}")]
    Save {
        session_id: i64,
        #[source]
        source: ApiError,
    },
}

impl ReconcileError {
    /// Whether resubmitting might succeed without user changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Inconsistent { .. } => true,
            ReconcileError::Create(e) | ReconcileError::Save { source: e, .. } => {
                !matches!(e.status(), Some(400 | 401 | 403 | 404 | 422))
            }
        }
    }

    /// The backend rejected the stored login during either phase.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ReconcileError::Create(e) | ReconcileError::Save { source: e, .. } => {
                e.is_unauthorized()
            }
            ReconcileError::Inconsistent { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ReconcileError::Create(e) => e.user_message(),
            ReconcileError::Inconsistent { .. } => {
                "The attendance session changed while saving, please try again".into()
            }
            ReconcileError::Save { source, .. } => source.user_message(),
        }
    }
}

#[derive(Clone)]
pub struct Reconciler<B> {
    backend: B,
}

impl<B: SessionBackend> Reconciler<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Save `draft` as the attendance of `key`, returning the session id.
    pub async fn reconcile(
        &self,
        key: SessionKey,
        subject_id: Option<i64>,
        draft: &Draft,
    ) -> Result<i64, ReconcileError> {
        let session_id = self.resolve_session(key, subject_id).await?;

        let records = draft.to_records();
        tracing::debug!(session_id, records = records.len(), "Upserting attendance records");
        self.backend
            .put_records(session_id, &records)
            .await
            .map_err(|source| {
                tracing::warn!(session_id, "Saving attendance failed: {}", source);
                ReconcileError::Save { session_id, source }
            })?;

        tracing::info!(
            session_id,
            class_id = key.class_id,
            date = %key.session_date,
            present = draft.present_count(),
            total = draft.len(),
            "Attendance saved"
        );
        Ok(session_id)
    }

    async fn resolve_session(
        &self,
        key: SessionKey,
        subject_id: Option<i64>,
    ) -> Result<i64, ReconcileError> {
        let body = NewSession {
            class_id: key.class_id,
            session_date: key.session_date,
            subject_id,
        };

        match self.backend.create_session(&body).await {
            Ok(session_id) => {
                tracing::debug!(session_id, "Created attendance session");
                Ok(session_id)
            }
            Err(e) if e.is_conflict() => {
                tracing::info!(
                    class_id = key.class_id,
                    date = %key.session_date,
                    "Attendance session already exists, looking it up"
                );
                self.lookup_session(key).await
            }
            Err(e) => {
                tracing::warn!("Creating attendance session failed: {}", e);
                Err(ReconcileError::Create(e))
            }
        }
    }

    async fn lookup_session(&self, key: SessionKey) -> Result<i64, ReconcileError> {
        let sessions = self
            .backend
            .list_sessions(key.class_id, key.session_date)
            .await
            .map_err(|e| {
                tracing::warn!("Looking up attendance session failed: {}", e);
                ReconcileError::Create(e)
            })?;

        match sessions.iter().find(|s| key.matches(s)) {
            Some(session) => Ok(session.id),
            None => {
                tracing::warn!(
                    class_id = key.class_id,
                    date = %key.session_date,
                    candidates = sessions.len(),
                    "Conflicting attendance session not found"
                );
                Err(ReconcileError::Inconsistent { key })
            }
        }
    }
}
