//! Class attendance reports: defaulters, daily counts and monthly totals,
//! with CSV downloads.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;

use crate::api::types::{ClassSummary, DailyRow};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentPrincipal;
use crate::routes::home::Html;
use crate::routes::optional;
use crate::routes::view::{class_options, Field, NavLink, ReportPage, Section};
use crate::state::AppState;
use crate::stats::{self, RiskLevel};

/// Default width of the daily report window.
const DAILY_WINDOW_DAYS: i64 = 30;

#[derive(Deserialize)]
struct ReportQuery {
    class_id: Option<String>,
    threshold: Option<String>,
    from: Option<String>,
    to: Option<String>,
    year: Option<String>,
}

/// Parsed report filters with defaults filled in.
struct Filters {
    class_id: Option<i64>,
    threshold: f64,
    from: NaiveDate,
    to: NaiveDate,
    year: i32,
}

impl Filters {
    fn parse(query: &ReportQuery, default_threshold: f64) -> AppResult<Self> {
        let today = chrono::Local::now().date_naive();
        let to = optional(query.to.as_deref(), "to date")?.unwrap_or(today);
        let from = optional(query.from.as_deref(), "from date")?
            .unwrap_or(to - Duration::days(DAILY_WINDOW_DAYS));
        if from > to {
            return Err(AppError::BadRequest(
                "The start date must not be after the end date".into(),
            ));
        }

        let threshold = optional(query.threshold.as_deref(), "threshold")?
            .unwrap_or(default_threshold);
        if !(0.0..=100.0).contains(&threshold) {
            return Err(AppError::BadRequest(
                "Threshold must be between 0 and 100".into(),
            ));
        }

        Ok(Self {
            class_id: optional(query.class_id.as_deref(), "class")?,
            threshold,
            from,
            to,
            year: optional(query.year.as_deref(), "year")?.unwrap_or(today.year()),
        })
    }

    /// Selected class, or the first assigned one.
    fn class_or_first(&self, classes: &[ClassSummary]) -> Option<i64> {
        self.class_id.or_else(|| classes.first().map(|c| c.id))
    }
}

fn class_name(classes: &[ClassSummary], class_id: i64) -> String {
    classes
        .iter()
        .find(|c| c.id == class_id)
        .map(ClassSummary::label)
        .unwrap_or_else(|| format!("Class {}", class_id))
}

fn no_classes(page: ReportPage) -> Html<ReportPage> {
    Html(page.section(
        Section::new("Classes", &["Class"]).empty_text("No classes are assigned to you yet"),
    ))
}

async fn defaulters(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let filters = Filters::parse(&query, state.config.reports.defaulter_threshold)?;
    let classes = state.api.teacher_classes().await?;
    let page = ReportPage::new(&principal, "Defaulters");
    let Some(class_id) = filters.class_or_first(&classes) else {
        return Ok(no_classes(page).into_response());
    };

    let mut rows = state.api.defaulters(class_id, filters.threshold).await?;
    stats::sort_worst_first(&mut rows);

    let mut table = Section::new(
        "Students below the threshold",
        &["Name", "Roll", "Present", "Sessions", "%", "Level"],
    )
    .empty_text("Nobody is below the threshold");
    for d in &rows {
        table.linked_row(format!("/teacher/students/{}", d.student_id), [
            d.name.clone().unwrap_or_else(|| format!("Student {}", d.student_id)),
            d.roll.clone().unwrap_or_default(),
            d.presents.to_string(),
            d.total_sessions.to_string(),
            d.percent.to_string(),
            RiskLevel::classify(d.percent)
                .map(|l| l.to_string())
                .unwrap_or_default(),
        ]);
    }

    let page = page
        .subtitle(format!(
            "{}: {} student(s) under {}%",
            class_name(&classes, class_id),
            rows.len(),
            filters.threshold
        ))
        .filters(
            "/teacher/reports",
            vec![
                Field::select("class_id", "Class", class_options(&classes, Some(class_id))),
                Field::input("threshold", "Threshold %", "number", filters.threshold),
            ],
        )
        .download(NavLink::new(
            format!(
                "/teacher/reports/defaulters.csv?class_id={}&threshold={}",
                class_id, filters.threshold
            ),
            "Download CSV",
        ))
        .section(table);

    Ok(Html(page).into_response())
}

async fn daily(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let filters = Filters::parse(&query, state.config.reports.defaulter_threshold)?;
    let classes = state.api.teacher_classes().await?;
    let page = ReportPage::new(&principal, "Daily attendance");
    let Some(class_id) = filters.class_or_first(&classes) else {
        return Ok(no_classes(page).into_response());
    };

    let rows = state
        .api
        .class_daily(class_id, filters.from, filters.to)
        .await?;

    let mut table = Section::new("By day", &["Date", "Present marks", "Sessions"])
        .empty_text("No attendance recorded in this period");
    for r in &rows {
        table.row([
            r.date.to_string(),
            r.present.to_string(),
            r.total_sessions.to_string(),
        ]);
    }

    let page = page
        .subtitle(format!(
            "{}, {} to {}",
            class_name(&classes, class_id),
            filters.from,
            filters.to
        ))
        .filters(
            "/teacher/reports/daily",
            vec![
                Field::select("class_id", "Class", class_options(&classes, Some(class_id))),
                Field::input("from", "From", "date", filters.from),
                Field::input("to", "To", "date", filters.to),
            ],
        )
        .download(NavLink::new(
            format!(
                "/teacher/reports/daily.csv?class_id={}&from={}&to={}",
                class_id, filters.from, filters.to
            ),
            "Download CSV",
        ))
        .section(table);

    Ok(Html(page).into_response())
}

async fn monthly(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let filters = Filters::parse(&query, state.config.reports.defaulter_threshold)?;
    let classes = state.api.teacher_classes().await?;
    let page = ReportPage::new(&principal, "Monthly attendance");
    let Some(class_id) = filters.class_or_first(&classes) else {
        return Ok(no_classes(page).into_response());
    };

    let rows = state.api.class_monthly(class_id, filters.year).await?;

    let mut table = Section::new("By month", &["Month", "Present marks", "Sessions"])
        .empty_text("No attendance recorded this year");
    for r in &rows {
        table.row([
            month_name(r.month),
            r.present.to_string(),
            r.total_sessions.to_string(),
        ]);
    }

    let page = page
        .subtitle(format!("{}, {}", class_name(&classes, class_id), filters.year))
        .filters(
            "/teacher/reports/monthly",
            vec![
                Field::select("class_id", "Class", class_options(&classes, Some(class_id))),
                Field::input("year", "Year", "number", filters.year),
            ],
        )
        .section(table);

    Ok(Html(page).into_response())
}

/// English month name, or the raw number when it is not a calendar month.
pub(crate) fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| month.to_string())
}

fn csv_download(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// Daily rows as CSV. `present` counts PRESENT marks across every session
/// of the day, so no percentage is derived from it.
pub fn daily_csv(rows: &[DailyRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "present", "total_sessions"])?;
    for r in rows {
        writer.write_record([
            r.date.to_string(),
            r.present.to_string(),
            r.total_sessions.to_string(),
        ])?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

fn required_class(filters: &Filters) -> AppResult<i64> {
    filters
        .class_id
        .ok_or_else(|| AppError::BadRequest("class_id is required".into()))
}

async fn daily_download(
    State(state): State<AppState>,
    _principal: CurrentPrincipal,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let filters = Filters::parse(&query, state.config.reports.defaulter_threshold)?;
    let class_id = required_class(&filters)?;
    let rows = state
        .api
        .class_daily(class_id, filters.from, filters.to)
        .await?;
    let body = daily_csv(&rows)?;
    let filename = format!(
        "daily_class_{}_{}_{}.csv",
        class_id, filters.from, filters.to
    );
    Ok(csv_download(&filename, body))
}

/// The backend renders this CSV; it is passed through untouched.
async fn defaulters_download(
    State(state): State<AppState>,
    _principal: CurrentPrincipal,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let filters = Filters::parse(&query, state.config.reports.defaulter_threshold)?;
    let class_id = required_class(&filters)?;
    let body = state.api.defaulters_csv(class_id, filters.threshold).await?;
    Ok(csv_download(
        &format!("defaulters_class_{}.csv", class_id),
        body,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/teacher/reports", get(defaulters))
        .route("/teacher/reports/daily", get(daily))
        .route("/teacher/reports/daily.csv", get(daily_download))
        .route("/teacher/reports/monthly", get(monthly))
        .route("/teacher/reports/defaulters.csv", get(defaulters_download))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ReportQuery {
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.to_string())
        };
        ReportQuery {
            class_id: get("class_id"),
            threshold: get("threshold"),
            from: get("from"),
            to: get("to"),
            year: get("year"),
        }
    }

    #[test]
    fn filters_fill_defaults() {
        let f = Filters::parse(&query(&[("to", "2024-03-31")]), 75.0).unwrap();
        assert_eq!(f.class_id, None);
        assert_eq!(f.threshold, 75.0);
        assert_eq!(f.to, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(f.from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn filters_treat_blank_as_missing() {
        let f = Filters::parse(&query(&[("class_id", ""), ("threshold", " ")]), 80.0).unwrap();
        assert_eq!(f.class_id, None);
        assert_eq!(f.threshold, 80.0);
    }

    #[test]
    fn filters_reject_bad_input() {
        assert!(Filters::parse(&query(&[("class_id", "abc")]), 75.0).is_err());
        assert!(Filters::parse(&query(&[("threshold", "120")]), 75.0).is_err());
        assert!(Filters::parse(
            &query(&[("from", "2024-03-02"), ("to", "2024-03-01")]),
            75.0
        )
        .is_err());
    }

    #[test]
    fn daily_csv_keeps_raw_counts() {
        // 30 marks from a single session: a whole class present once
        let rows = vec![
            DailyRow {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                present: 30,
                total_sessions: 1,
            },
            DailyRow {
                date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                present: 0,
                total_sessions: 0,
            },
        ];
        let body = String::from_utf8(daily_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            body,
            "date,present,total_sessions\n2024-03-01,30,1\n2024-03-02,0,0\n"
        );
    }

    #[test]
    fn month_names_do_not_wrap() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "0");
        assert_eq!(month_name(257), "257");
    }
}
