use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::api::types::{AdminAnalytics, Listing};
use crate::error::AppResult;
use crate::extractors::CurrentPrincipal;
use crate::routes::home::Html;
use crate::routes::view::{ReportPage, Section};
use crate::state::AppState;

fn count_label<T>(listing: &Listing<T>, noun: &str) -> String {
    // Prefer the backend's total; it may exceed the returned page
    let total = listing.total.unwrap_or(listing.items.len() as u64);
    format!("{} {}", total, noun)
}

fn analytics_section(analytics: &AdminAnalytics) -> Section {
    let mut section = Section::new("Last 30 days", &["Metric", "Value"]);
    section.row(["Students".to_string(), analytics.total_students.to_string()]);
    section.row(["Teachers".to_string(), analytics.total_teachers.to_string()]);
    section.row(["Sessions held".to_string(), analytics.sessions_last_30.to_string()]);
    section.row([
        "Average attendance".to_string(),
        format!("{:.1}%", analytics.avg_attendance_last_30),
    ]);
    section
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let analytics = state.api.admin_analytics().await?;
    let page = ReportPage::new(&principal, "Administration")
        .subtitle(format!("Signed in as {}", principal.email))
        .section(analytics_section(&analytics));
    Ok(Html(page))
}

async fn analytics(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let analytics = state.api.admin_analytics().await?;
    Ok(Html(
        ReportPage::new(&principal, "Analytics").section(analytics_section(&analytics)),
    ))
}

async fn classes(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let listing = state.api.admin_classes().await?;
    let mut table = Section::new("Classes", &["ID", "Name", "Section", "Year"])
        .empty_text("No classes yet");
    for c in &listing.items {
        table.row([
            c.id.to_string(),
            c.name.clone(),
            c.section.clone().unwrap_or_default(),
            c.year.map(|y| y.to_string()).unwrap_or_default(),
        ]);
    }
    Ok(Html(
        ReportPage::new(&principal, "Classes")
            .subtitle(count_label(&listing, "classes"))
            .section(table),
    ))
}

async fn students(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let listing = state.api.admin_students().await?;
    let mut table = Section::new("Students", &["ID", "Name", "Email", "Roll", "Class"])
        .empty_text("No students yet");
    for s in &listing.items {
        table.row([
            s.id.to_string(),
            s.name.clone().unwrap_or_default(),
            s.email.clone().unwrap_or_default(),
            s.roll_no.clone().unwrap_or_default(),
            s.class_id.map(|id| id.to_string()).unwrap_or_default(),
        ]);
    }
    Ok(Html(
        ReportPage::new(&principal, "Students")
            .subtitle(count_label(&listing, "students"))
            .section(table),
    ))
}

async fn teachers(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let listing = state.api.admin_teachers().await?;
    let mut table = Section::new("Teachers", &["ID", "Name", "Email"]).empty_text("No teachers yet");
    for t in &listing.items {
        table.row([
            t.user_id.to_string(),
            t.name.clone().unwrap_or_default(),
            t.email.clone().unwrap_or_default(),
        ]);
    }
    Ok(Html(
        ReportPage::new(&principal, "Teachers")
            .subtitle(count_label(&listing, "teachers"))
            .section(table),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/classes", get(classes))
        .route("/admin/students", get(students))
        .route("/admin/teachers", get(teachers))
        .route("/admin/analytics", get(analytics))
}
