//! In-process stand-in for the attendance backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use rollcall::auth::{Principal, PrincipalStore, Role};
use rollcall::config::{BackendConfig, Config};
use rollcall::db;
use rollcall::state::{AppState, DbPool};

#[derive(Debug, Clone)]
pub struct MockSession {
    pub id: i64,
    pub class_id: i64,
    pub session_date: String,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub sessions: Vec<MockSession>,
    pub next_id: i64,
    pub creates: usize,
    pub lookups: usize,
    pub puts: Vec<(i64, Value)>,
    pub bearer: Vec<Option<String>>,
    pub reject_token: bool,
    pub slow_create: Option<Duration>,
    pub fail_put: bool,
    /// Answer the class list and roster with 503.
    pub fail_classes: bool,
    pub daily_queries: Vec<HashMap<String, String>>,
    /// `subject_id` of every create request, in order.
    pub subjects: Vec<Option<i64>>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Recorded>>,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.lock().next_id = 1;
        backend
    }

    pub fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap()
    }

    pub fn seed_session(&self, id: i64, class_id: i64, session_date: &str) {
        self.lock().sessions.push(MockSession {
            id,
            class_id,
            session_date: session_date.to_string(),
        });
    }

    /// Serve on an ephemeral localhost port; returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/teacher/classes", get(classes))
            .route("/api/teacher/classes/{id}/students", get(students))
            .route("/api/teacher/assignments", get(assignments))
            .route("/api/teacher/dashboard", get(teacher_dashboard))
            .route("/api/teacher/sessions", post(create_session).get(list_sessions))
            .route("/api/teacher/sessions/{id}/records", put(put_records))
            .route("/api/reports/defaulters", get(defaulters))
            .route("/api/reports/defaulters.csv", get(defaulters_csv))
            .route("/api/reports/class/daily", get(class_daily))
            .route("/api/reports/class/monthly", get(class_monthly))
            .route("/api/reports/student/{id}", get(student_report))
            .route("/api/admin/classes", get(admin_classes))
            .route("/api/admin/students", get(admin_students))
            .route("/api/admin/teachers", get(admin_teachers))
            .route("/api/admin/analytics", get(admin_analytics))
            .route("/api/student/me/attendance", get(my_attendance))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "error": "Token expired"})),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "Invalid credentials"})),
        )
            .into_response();
    }
    let role = match body["email"].as_str() {
        Some("admin@school.test") => "admin",
        Some("student@school.test") => "Student",
        Some("ghost@school.test") => "JANITOR",
        _ => "teacher",
    };
    Json(json!({
        "success": true,
        "data": {
            "access_token": "tok-123",
            "user": {"id": 7, "name": "Asha", "email": body["email"], "role": role}
        }
    }))
    .into_response()
}

fn busy() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"success": false, "error": "Server busy"})),
    )
        .into_response()
}

async fn classes(State(b): State<MockBackend>, headers: HeaderMap) -> Response {
    {
        let mut s = b.lock();
        s.bearer.push(bearer(&headers));
        if s.fail_classes {
            return busy();
        }
    }
    Json(json!({
        "success": true,
        "data": [{"id": 12, "name": "Grade 5", "section": "B", "year": 2024}]
    }))
    .into_response()
}

async fn students(State(b): State<MockBackend>, Path(id): Path<i64>) -> Response {
    if b.lock().fail_classes {
        return busy();
    }
    let data = if id == 12 {
        json!([
            {"id": 1, "name": "Ravi", "roll_number": "01", "class_id": 12},
            {"id": 2, "name": "Meera", "roll_number": "02", "class_id": 12}
        ])
    } else {
        json!([])
    };
    Json(json!({"success": true, "data": data})).into_response()
}

async fn assignments() -> Response {
    Json(json!({
        "success": true,
        "data": [
            {"id": 1, "teacher_id": 4, "class_id": 12, "subject_id": 3, "subject_name": "Maths"},
            {"id": 2, "teacher_id": 4, "class_id": 12, "subject_id": 4, "subject_name": "Science"},
            {"id": 3, "teacher_id": 4, "class_id": 14, "subject_id": 9, "subject_name": "History"}
        ]
    }))
    .into_response()
}

async fn teacher_dashboard() -> Response {
    Json(json!({
        "success": true,
        "data": {"total_students": 42, "today_attendance_rate": 88, "pending_tasks": 0, "upcoming_classes": 0}
    }))
    .into_response()
}

async fn create_session(
    State(b): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = {
        let mut s = b.lock();
        s.creates += 1;
        s.bearer.push(bearer(&headers));
        s.subjects.push(body["subject_id"].as_i64());
        s.slow_create
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut s = b.lock();
    if s.reject_token {
        return unauthorized();
    }
    let class_id = body["class_id"].as_i64().unwrap_or_default();
    let date = body["session_date"].as_str().unwrap_or_default().to_string();
    if s
        .sessions
        .iter()
        .any(|x| x.class_id == class_id && x.session_date == date)
    {
        return (
            StatusCode::CONFLICT,
            Json(json!({"success": false, "error": "Attendance session already exists"})),
        )
            .into_response();
    }

    // Skip ids already seeded by the test
    let mut id = s.next_id;
    while s.sessions.iter().any(|x| x.id == id) {
        id += 1;
    }
    s.next_id = id + 1;
    s.sessions.push(MockSession {
        id,
        class_id,
        session_date: date,
    });
    (
        StatusCode::CREATED,
        Json(json!({"success": true, "data": {"session_id": id}})),
    )
        .into_response()
}

/// Filters by class only, like a loose backend query would.
async fn list_sessions(
    State(b): State<MockBackend>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut s = b.lock();
    s.lookups += 1;
    let class_id: i64 = query
        .get("class_id")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let data: Vec<Value> = s
        .sessions
        .iter()
        .filter(|x| x.class_id == class_id)
        .map(|x| json!({"id": x.id, "class_id": x.class_id, "session_date": x.session_date}))
        .collect();
    Json(json!({"success": true, "data": data})).into_response()
}

async fn put_records(
    State(b): State<MockBackend>,
    Path(id): Path<i64>,
    Json(records): Json<Value>,
) -> Response {
    let mut s = b.lock();
    if s.fail_put {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": "Database unavailable"})),
        )
            .into_response();
    }
    s.puts.push((id, records));
    Json(json!({"success": true})).into_response()
}

async fn defaulters() -> Response {
    Json(json!({
        "success": true,
        "data": [
            {"student_id": 2, "name": "Meera", "roll": "02", "presents": 5, "total_sessions": 10, "percent": 50},
            {"student_id": 3, "name": "Kiran", "roll": "03", "presents": 13, "total_sessions": 20, "percent": 65}
        ]
    }))
    .into_response()
}

async fn defaulters_csv() -> Response {
    (
        [(header::CONTENT_TYPE, "text/csv")],
        "student_id,name,percent\n2,Meera,50\n",
    )
        .into_response()
}

async fn class_daily(
    State(b): State<MockBackend>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    b.lock().daily_queries.push(query);
    // Present marks summed over every session of the day
    Json(json!({
        "success": true,
        "data": [
            {"date": "2024-03-01", "present": 30, "total_sessions": 1},
            {"date": "2024-03-04", "present": 52, "total_sessions": 2}
        ]
    }))
    .into_response()
}

async fn class_monthly() -> Response {
    Json(json!({
        "success": true,
        "data": [
            {"month": 2, "present": 310, "total_sessions": 18},
            {"month": 3, "present": 75, "total_sessions": 4}
        ]
    }))
    .into_response()
}

async fn student_report(Path(id): Path<i64>) -> Response {
    if id != 2 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Student not found"})),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "data": {
            "basic_info": {"name": "Meera", "roll": "02", "class_id": 12},
            "summary": {"total_sessions": 10, "presents": 5, "percent": 50, "risk": "Critical"},
            "monthly_trend": [{"month": 3, "percent": 50}],
            "subject_performance": [{"subject": "Maths", "percent": 40}],
            "calendar": [
                {"date": "2024-03-01", "status": "PRESENT", "subject_id": 3, "subject_name": "Maths"},
                {"date": "2024-03-04", "status": "ABSENT", "subject_id": 3, "subject_name": "Maths"}
            ]
        }
    }))
    .into_response()
}

async fn admin_classes() -> Response {
    Json(json!({
        "success": true,
        "total": 31,
        "data": [{"id": 12, "name": "Grade 5", "section": "B", "year": 2024}]
    }))
    .into_response()
}

async fn admin_students() -> Response {
    Json(json!({
        "success": true,
        "data": [
            {"id": 1, "name": "Ravi", "email": "ravi@school.test", "roll_no": "01", "class_id": 12},
            {"id": 2, "name": "Meera", "email": "meera@school.test", "roll_no": "02", "class_id": 12}
        ]
    }))
    .into_response()
}

async fn admin_teachers() -> Response {
    Json(json!({
        "success": true,
        "total": 1,
        "data": [{"user_id": 7, "name": "Asha", "email": "asha@school.test"}]
    }))
    .into_response()
}

async fn admin_analytics() -> Response {
    Json(json!({
        "success": true,
        "data": {
            "total_students": 420,
            "total_teachers": 18,
            "sessions_last_30": 96,
            "avg_attendance_last_30": 81.5
        }
    }))
    .into_response()
}

async fn my_attendance() -> Response {
    Json(json!({
        "success": true,
        "data": {"total_sessions": 20, "present": 18, "absent": 2, "percentage": 90.0}
    }))
    .into_response()
}

/// A migrated SQLite pool in a temp dir; keep the dir alive for the test.
pub fn temp_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("rollcall.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    (dir, pool)
}

pub fn backend_config(base_url: &str, timeout_secs: u64) -> BackendConfig {
    BackendConfig {
        base_url: base_url.to_string(),
        timeout_secs,
    }
}

pub fn app_state(base_url: &str, pool: DbPool) -> AppState {
    let mut config = Config::default();
    config.backend = backend_config(base_url, 5);
    AppState::new(config, pool).unwrap()
}

pub fn principal(role: Role) -> Principal {
    Principal {
        id: 7,
        name: "Asha".into(),
        email: "asha@school.test".into(),
        role: Some(role),
    }
}

pub fn login_as(store: &PrincipalStore, role: Role) {
    store.save("tok-123", &principal(role)).unwrap();
}
