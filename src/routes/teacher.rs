use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::api::types::StudentReport;
use crate::error::AppResult;
use crate::extractors::CurrentPrincipal;
use crate::routes::home::Html;
use crate::routes::optional;
use crate::routes::reports::month_name;
use crate::routes::view::{class_options, Field, NavLink, ReportPage, Section};
use crate::state::AppState;
use crate::stats::{self, RiskBreakdown, RiskLevel};

/// Defaulters listed on the dashboard.
const WORST_SHOWN: usize = 10;

#[derive(Deserialize)]
struct DashboardQuery {
    class_id: Option<String>,
}

/// Teacher home: today's summary, assigned classes and the at-risk
/// breakdown of one class.
async fn dashboard(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<impl IntoResponse> {
    let classes = state.api.teacher_classes().await?;
    let summary = state.api.teacher_dashboard().await?;
    let selected = optional::<i64>(query.class_id.as_deref(), "class")?
        .or_else(|| classes.first().map(|c| c.id));

    let mut today = Section::new("Today", &["", ""]);
    today.row(["Students".to_string(), summary.total_students.to_string()]);
    today.row([
        "Attendance today".to_string(),
        format!("{}%", summary.today_attendance_rate),
    ]);

    let mut class_table = Section::new("My classes", &["Class", "Year"])
        .empty_text("No classes are assigned to you yet");
    for class in &classes {
        class_table.row([
            class.label(),
            class.year.map(|y| y.to_string()).unwrap_or_default(),
        ]);
    }

    let threshold = state.config.reports.defaulter_threshold;
    let mut page = ReportPage::new(&principal, format!("Welcome, {}", principal.name))
        .subtitle(format!(
            "{} class(es); students under {}% attendance are flagged",
            classes.len(),
            threshold
        ))
        .section(today)
        .section(class_table);

    if let Some(class_id) = selected {
        page = page.filters(
            "/teacher",
            vec![Field::select("class_id", "Class", class_options(&classes, selected))],
        );

        let mut defaulters = state.api.defaulters(class_id, threshold).await?;
        stats::sort_worst_first(&mut defaulters);
        let breakdown = RiskBreakdown::from_defaulters(&defaulters);

        let mut risk = Section::new("Attendance risk", &["Level", "Students"]);
        for (label, count) in breakdown.rows() {
            risk.row([label.to_string(), count.to_string()]);
        }
        risk.row(["Total flagged".to_string(), breakdown.total().to_string()]);

        let mut worst = Section::new("Lowest attendance", &["Name", "Roll", "Present", "%", "Level"])
            .empty_text("Nobody is below the threshold");
        for d in defaulters.iter().take(WORST_SHOWN) {
            worst.linked_row(format!("/teacher/students/{}", d.student_id), [
                d.name.clone().unwrap_or_else(|| format!("Student {}", d.student_id)),
                d.roll.clone().unwrap_or_default(),
                format!("{}/{}", d.presents, d.total_sessions),
                d.percent.to_string(),
                RiskLevel::classify(d.percent)
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
            ]);
        }

        page = page
            .section(risk)
            .section(worst)
            .download(NavLink::new(
                format!("/teacher/take-attendance?class_id={}", class_id),
                "Take attendance",
            ))
            .download(NavLink::new(
                format!("/teacher/reports?class_id={}", class_id),
                "Full defaulter report",
            ));
    }

    Ok(Html(page))
}

fn student_sections(report: &StudentReport) -> Vec<Section> {
    let totals = &report.summary;
    let mut summary = Section::new("Summary", &["", ""]);
    summary.row(["Sessions".to_string(), totals.total_sessions.to_string()]);
    summary.row(["Present".to_string(), totals.presents.to_string()]);
    summary.row(["Attendance".to_string(), format!("{}%", totals.percent)]);
    // Level from the shared buckets; the backend label covers 75% and up.
    let level = RiskLevel::classify(totals.percent)
        .map(|l| l.to_string())
        .or_else(|| totals.risk.clone())
        .unwrap_or_default();
    summary.row(["Risk".to_string(), level]);

    let mut months = Section::new("By month", &["Month", "%"])
        .empty_text("No sessions recorded");
    for m in &report.monthly_trend {
        months.row([month_name(m.month), m.percent.to_string()]);
    }

    let mut subjects = Section::new("By subject", &["Subject", "%"])
        .empty_text("No sessions recorded");
    for s in &report.subject_performance {
        subjects.row([s.subject.clone(), s.percent.to_string()]);
    }

    let mut calendar: Vec<_> = report.calendar.iter().collect();
    calendar.sort_by(|a, b| b.date.cmp(&a.date));
    let mut sessions = Section::new("Sessions", &["Date", "Subject", "Status"])
        .empty_text("No sessions recorded");
    for entry in calendar {
        sessions.row([
            entry.date.to_string(),
            entry.subject_name.clone().unwrap_or_default(),
            entry.status.to_string(),
        ]);
    }

    vec![summary, months, subjects, sessions]
}

/// One student's history: totals, trends and every marked session.
async fn student_report(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(student_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let report = state.api.student_report(student_id).await?;
    let info = report.basic_info.clone().unwrap_or_default();
    let name = info
        .name
        .clone()
        .unwrap_or_else(|| format!("Student {}", student_id));
    let subtitle = match &info.roll {
        Some(roll) => format!("Roll {}", roll),
        None => String::new(),
    };

    let mut page = ReportPage::new(&principal, name).subtitle(subtitle);
    if let Some(class_id) = info.class_id {
        page = page.download(NavLink::new(
            format!("/teacher/reports?class_id={}", class_id),
            "Class defaulters",
        ));
    }
    for section in student_sections(&report) {
        page = page.section(section);
    }
    Ok(Html(page))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/teacher", get(dashboard))
        .route("/teacher/students/{id}", get(student_report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CalendarEntry, MonthPercent, StudentTotals};
    use crate::attendance::Status;
    use chrono::NaiveDate;

    fn report() -> StudentReport {
        StudentReport {
            summary: StudentTotals {
                total_sessions: 4,
                presents: 3,
                percent: 75,
                risk: Some("Safe".into()),
            },
            monthly_trend: vec![MonthPercent { month: 3, percent: 75 }],
            calendar: vec![
                CalendarEntry {
                    date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    status: Status::Present,
                    subject_name: Some("Maths".into()),
                },
                CalendarEntry {
                    date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                    status: Status::Absent,
                    subject_name: None,
                },
            ],
            ..StudentReport::default()
        }
    }

    #[test]
    fn student_sections_list_newest_session_first() {
        let sections = student_sections(&report());
        let sessions = &sections[3];
        assert_eq!(sessions.rows[0][0], "2024-03-04");
        assert_eq!(sessions.rows[0][2], "ABSENT");
        assert_eq!(sessions.rows[1][1], "Maths");
        assert_eq!(sections[1].rows[0], vec!["March".to_string(), "75".to_string()]);
        assert!(sections[2].rows.is_empty());
    }

    #[test]
    fn student_risk_uses_backend_label_above_buckets() {
        let sections = student_sections(&report());
        assert_eq!(sections[0].rows[3][1], "Safe");

        let mut low = report();
        low.summary.percent = 50;
        let sections = student_sections(&low);
        assert_eq!(
            sections[0].rows[3][1],
            RiskLevel::classify(50).unwrap().to_string()
        );
    }
}
