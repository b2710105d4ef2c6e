//! HTTP client for the attendance backend.
//!
//! Every request carries the stored bearer token when there is one. Any 401
//! response clears the stored login state before the error is handed back,
//! so the next navigation is redirected to the login page.

pub mod error;
pub mod types;

use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::PrincipalStore;
use crate::config::BackendConfig;

pub use error::ApiError;
use types::*;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    principals: PrincipalStore,
}

impl ApiClient {
    pub fn new(config: &BackendConfig, principals: PrincipalStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base = Url::parse(&format!("{}/api/", config.base_url.trim_end_matches('/')))?;
        Ok(Self {
            http,
            base,
            principals,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn with_token(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.principals.token() {
            Ok(Some(token)) => builder.bearer_auth(token),
            Ok(None) => builder,
            Err(e) => {
                tracing::warn!("Sending request unauthenticated, token unreadable: {}", e);
                builder
            }
        }
    }

    /// Send a request and turn non-2xx answers into `ApiError::Status`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.with_token(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        if code == 401 {
            tracing::warn!("Backend rejected credentials, clearing login state");
            if let Err(e) = self.principals.clear() {
                tracing::error!("Could not clear login state: {}", e);
            }
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error.or(body.message))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        Err(ApiError::Status {
            status: code,
            message,
        })
    }

    async fn envelope<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn data<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        Self::envelope(response)
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("missing data".into()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.get(url).query(query)).await?;
        Self::data(response).await
    }

    async fn listing<T: DeserializeOwned>(&self, path: &str) -> Result<Listing<T>, ApiError> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.get(url)).await?;
        let envelope: Envelope<Vec<T>> = Self::envelope(response).await?;
        Ok(Listing {
            items: envelope.data.unwrap_or_default(),
            total: envelope.total,
        })
    }

    // -- Auth --

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginData, ApiError> {
        let url = self.endpoint("auth/login")?;
        let response = self
            .send(self.http.post(url).json(&LoginRequest { email, password }))
            .await?;
        Self::data(response).await
    }

    // -- Teacher --

    pub async fn teacher_classes(&self) -> Result<Vec<ClassSummary>, ApiError> {
        self.get("teacher/classes", &[]).await
    }

    /// Class and subject pairs the teacher is assigned to.
    pub async fn teacher_assignments(&self) -> Result<Vec<Assignment>, ApiError> {
        self.get("teacher/assignments", &[]).await
    }

    pub async fn teacher_dashboard(&self) -> Result<TeacherDashboard, ApiError> {
        self.get("teacher/dashboard", &[]).await
    }

    pub async fn class_students(&self, class_id: i64) -> Result<Vec<Student>, ApiError> {
        let url = self.endpoint(&format!("teacher/classes/{}/students", class_id))?;
        let response = self.send(self.http.get(url)).await?;
        let envelope: Envelope<Vec<Student>> = Self::envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn create_session(&self, body: &NewSession) -> Result<i64, ApiError> {
        let url = self.endpoint("teacher/sessions")?;
        let response = self.send(self.http.post(url).json(body)).await?;
        let created: CreatedSession = Self::data(response).await?;
        Ok(created.session_id)
    }

    /// Sessions of a class around `date`. The backend filters broadly (by
    /// year and range); callers must still match the exact date.
    pub async fn list_sessions(
        &self,
        class_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<SessionSummary>, ApiError> {
        let day = date.to_string();
        let query = [
            ("class_id", class_id.to_string()),
            ("year", date.year().to_string()),
            ("from", day.clone()),
            ("to", day),
        ];
        let url = self.endpoint("teacher/sessions")?;
        let response = self.send(self.http.get(url).query(&query)).await?;
        let envelope: Envelope<Vec<SessionSummary>> = Self::envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn put_records(&self, session_id: i64, records: &[RecordInput]) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("teacher/sessions/{}/records", session_id))?;
        self.send(self.http.put(url).json(records)).await?;
        Ok(())
    }

    // -- Reports --

    pub async fn class_daily(
        &self,
        class_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRow>, ApiError> {
        let query = [
            ("class_id", class_id.to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ];
        self.get("reports/class/daily", &query).await
    }

    pub async fn class_monthly(&self, class_id: i64, year: i32) -> Result<Vec<MonthlyRow>, ApiError> {
        let query = [("class_id", class_id.to_string()), ("year", year.to_string())];
        self.get("reports/class/monthly", &query).await
    }

    pub async fn defaulters(&self, class_id: i64, threshold: f64) -> Result<Vec<Defaulter>, ApiError> {
        let query = [
            ("class_id", class_id.to_string()),
            ("threshold", threshold.to_string()),
        ];
        self.get("reports/defaulters", &query).await
    }

    pub async fn student_report(&self, student_id: i64) -> Result<StudentReport, ApiError> {
        self.get(&format!("reports/student/{}", student_id), &[]).await
    }

    /// Raw CSV as produced by the backend.
    pub async fn defaulters_csv(&self, class_id: i64, threshold: f64) -> Result<Vec<u8>, ApiError> {
        let query = [
            ("class_id", class_id.to_string()),
            ("threshold", threshold.to_string()),
        ];
        let url = self.endpoint("reports/defaulters.csv")?;
        let response = self.send(self.http.get(url).query(&query)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // -- Admin --

    pub async fn admin_classes(&self) -> Result<Listing<ClassSummary>, ApiError> {
        self.listing("admin/classes").await
    }

    pub async fn admin_students(&self) -> Result<Listing<AdminStudent>, ApiError> {
        self.listing("admin/students").await
    }

    pub async fn admin_teachers(&self) -> Result<Listing<Teacher>, ApiError> {
        self.listing("admin/teachers").await
    }

    pub async fn admin_analytics(&self) -> Result<AdminAnalytics, ApiError> {
        self.get("admin/analytics", &[]).await
    }

    // -- Student --

    pub async fn my_attendance(&self) -> Result<AttendanceSummary, ApiError> {
        self.get("student/me/attendance", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn client(base_url: &str) -> ApiClient {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let config = BackendConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        };
        ApiClient::new(&config, PrincipalStore::new(pool)).unwrap()
    }

    #[test]
    fn base_url_gains_api_prefix() {
        let api = client("http://localhost:5000/");
        assert_eq!(api.base_url().as_str(), "http://localhost:5000/api/");
    }

    #[test]
    fn endpoints_join_under_api() {
        let api = client("http://localhost:5000");
        assert_eq!(
            api.endpoint("/teacher/sessions").unwrap().as_str(),
            "http://localhost:5000/api/teacher/sessions"
        );
        assert_eq!(
            api.endpoint("teacher/sessions/501/records").unwrap().as_str(),
            "http://localhost:5000/api/teacher/sessions/501/records"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        let pool = db::memory_pool().unwrap();
        let config = BackendConfig {
            base_url: "not a url".into(),
            timeout_secs: 5,
        };
        assert!(matches!(
            ApiClient::new(&config, PrincipalStore::new(pool)),
            Err(ApiError::Url(_))
        ));
    }
}
