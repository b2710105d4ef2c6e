use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::api::types::AttendanceSummary;
use crate::error::AppResult;
use crate::extractors::CurrentPrincipal;
use crate::routes::home::Html;
use crate::routes::view::{NavLink, ReportPage, Section};
use crate::state::AppState;
use crate::stats::Performance;

fn summary_section(summary: &AttendanceSummary, threshold: f64) -> Section {
    let standing = if summary.total_sessions == 0 {
        "No sessions yet".to_string()
    } else if summary.percentage < threshold {
        format!("Below the {}% requirement", threshold)
    } else {
        "Meets the requirement".to_string()
    };

    let mut section = Section::new("Summary", &["", ""]);
    section.row(["Sessions".to_string(), summary.total_sessions.to_string()]);
    section.row(["Present".to_string(), summary.present.to_string()]);
    section.row(["Absent".to_string(), summary.absent.to_string()]);
    section.row(["Attendance".to_string(), format!("{:.1}%", summary.percentage)]);
    section.row([
        "Performance".to_string(),
        Performance::from_percent(summary.percentage).to_string(),
    ]);
    section.row(["Standing".to_string(), standing]);
    section
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let summary = state.api.my_attendance().await?;
    let page = ReportPage::new(&principal, format!("Welcome, {}", principal.name))
        .subtitle(format!(
            "{:.1}% attendance, {}",
            summary.percentage,
            Performance::from_percent(summary.percentage)
        ))
        .download(NavLink::new("/student/attendance", "Attendance details"));
    Ok(Html(page))
}

async fn attendance(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<impl IntoResponse> {
    let summary = state.api.my_attendance().await?;
    let threshold = state.config.reports.defaulter_threshold;
    Ok(Html(
        ReportPage::new(&principal, "My attendance").section(summary_section(&summary, threshold)),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/student", get(dashboard))
        .route("/student/attendance", get(attendance))
}
