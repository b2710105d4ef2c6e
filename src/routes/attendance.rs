use std::collections::HashMap;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::types::{Assignment, ClassSummary, Student};
use crate::attendance::{field_name, Draft, SessionKey, Status};
use crate::auth::gate::LOGIN_PATH;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentPrincipal;
use crate::routes::home::Html;
use crate::routes::optional;
use crate::routes::view::{class_options, Nav, SelectOption, Toast};
use crate::state::AppState;

const PAGE: &str = "/teacher/take-attendance";

/// Hidden fields that carry each row's label through a POST.
fn name_field(student_id: i64) -> String {
    format!("name_{}", student_id)
}

fn roll_field(student_id: i64) -> String {
    format!("roll_{}", student_id)
}

#[derive(Template)]
#[template(path = "pages/take_attendance.html")]
struct TakeAttendanceTemplate {
    nav: Nav,
    toast: Option<Toast>,
    classes: Vec<SelectOption>,
    subjects: Vec<SelectOption>,
    class_id: String,
    date: String,
    rows: Vec<RosterRow>,
    present: usize,
    total: usize,
}

struct RosterRow {
    field: String,
    name_field: String,
    roll_field: String,
    name: String,
    roll: String,
    present: bool,
}

/// Everything needed to render the form for one class and date.
struct Sheet {
    classes: Vec<ClassSummary>,
    subjects: Vec<Assignment>,
    class_id: Option<i64>,
    date: NaiveDate,
    subject_id: Option<i64>,
    roster: Vec<Student>,
}

impl Sheet {
    /// The sheet exactly as the browser posted it, used when the backend
    /// cannot be asked again.
    fn posted(
        class_id: Option<i64>,
        date: Option<NaiveDate>,
        subject_id: Option<i64>,
        form: &HashMap<String, String>,
    ) -> Self {
        let classes = class_id
            .map(|id| ClassSummary {
                id,
                name: format!("Class {}", id),
                section: None,
                year: None,
            })
            .into_iter()
            .collect();
        let subjects = class_id
            .zip(subject_id)
            .map(|(class_id, subject_id)| Assignment {
                class_id,
                subject_id,
                subject_name: None,
            })
            .into_iter()
            .collect();

        Self {
            classes,
            subjects,
            class_id,
            date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            subject_id,
            roster: posted_roster(form),
        }
    }

    fn render(&self, nav: Nav, draft: &Draft, toast: Option<Toast>) -> TakeAttendanceTemplate {
        let rows = self
            .roster
            .iter()
            .map(|s| RosterRow {
                field: field_name(s.id),
                name_field: name_field(s.id),
                roll_field: roll_field(s.id),
                name: s.name.clone().unwrap_or_else(|| format!("Student {}", s.id)),
                roll: s.roll_number.clone().unwrap_or_default(),
                present: draft.is_present(s.id),
            })
            .collect();

        let subjects = self
            .subjects
            .iter()
            .map(|a| SelectOption {
                value: a.subject_id.to_string(),
                label: a.subject_label(),
                selected: Some(a.subject_id) == self.subject_id,
            })
            .collect();

        TakeAttendanceTemplate {
            nav,
            toast,
            classes: class_options(&self.classes, self.class_id),
            subjects,
            class_id: self.class_id.map(|id| id.to_string()).unwrap_or_default(),
            date: self.date.to_string(),
            rows,
            present: draft.present_count(),
            total: draft.len(),
        }
    }
}

/// Students named by the posted status fields, with their labels from the
/// hidden name and roll fields. Ordered by id.
fn posted_roster(form: &HashMap<String, String>) -> Vec<Student> {
    let mut ids: Vec<i64> = form
        .keys()
        .filter_map(|k| k.strip_prefix("status_")?.parse().ok())
        .collect();
    ids.sort_unstable();

    let label = |key: String| form.get(&key).filter(|v| !v.is_empty()).cloned();
    ids.into_iter()
        .map(|id| Student {
            id,
            name: label(name_field(id)),
            roll_number: label(roll_field(id)),
            class_id: None,
        })
        .collect()
}

#[derive(Deserialize)]
struct SheetQuery {
    class_id: Option<String>,
    date: Option<String>,
    subject_id: Option<String>,
}

/// Load classes and, for the chosen (or first) class, its subjects and roster.
async fn load_sheet(
    state: &AppState,
    class_id: Option<i64>,
    date: Option<NaiveDate>,
    subject_id: Option<i64>,
) -> AppResult<Sheet> {
    let classes = state.api.teacher_classes().await?;
    let class_id = class_id.or_else(|| classes.first().map(|c| c.id));
    let (subjects, roster) = match class_id {
        Some(id) => {
            let subjects = state
                .api
                .teacher_assignments()
                .await?
                .into_iter()
                .filter(|a| a.class_id == id)
                .collect();
            (subjects, state.api.class_students(id).await?)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(Sheet {
        classes,
        subjects,
        class_id,
        date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        subject_id,
        roster,
    })
}

async fn take_attendance(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<SheetQuery>,
) -> AppResult<Response> {
    let sheet = load_sheet(
        &state,
        optional(query.class_id.as_deref(), "class")?,
        optional(query.date.as_deref(), "date")?,
        optional(query.subject_id.as_deref(), "subject")?,
    )
    .await?;

    // New drafts start with everyone absent
    let draft = Draft::from_roster(&sheet.roster);
    let nav = Nav::for_principal(&principal);
    Ok(Html(sheet.render(nav, &draft, None)).into_response())
}

async fn submit_attendance(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    let action = form.get("action").map(String::as_str).unwrap_or("save");
    if action == "cancel" {
        return Ok(Redirect::to("/teacher").into_response());
    }

    let field = |name: &str| form.get(name).map(String::as_str);
    let class_id = optional(field("class_id"), "class")?;
    let date = optional(field("date"), "date")?;
    let subject_id = optional(field("subject_id"), "subject")?;
    let nav = Nav::for_principal(&principal);

    // Marks already made must survive a failed reload.
    let sheet = match load_sheet(&state, class_id, date, subject_id).await {
        Ok(sheet) => sheet,
        Err(AppError::Api(e)) if e.is_unauthorized() => {
            return Ok(Redirect::to(LOGIN_PATH).into_response());
        }
        Err(e) => {
            tracing::warn!("Reloading the attendance sheet failed: {}", e);
            let sheet = Sheet::posted(class_id, date, subject_id, &form);
            let mut draft = Draft::from_form(&sheet.roster, &form);
            apply_mark_all(action, &mut draft);
            let toast = Toast::error(format!(
                "Could not reach the server ({}). Your marks are kept, please try again.",
                reload_message(&e)
            ));
            return Ok(Html(sheet.render(nav, &draft, Some(toast))).into_response());
        }
    };

    let mut draft = Draft::from_form(&sheet.roster, &form);
    let toast = if apply_mark_all(action, &mut draft) {
        None
    } else {
        match save(&state, &sheet, &draft).await {
            Saved::Toast(toast) => Some(toast),
            Saved::LoggedOut => return Ok(Redirect::to(LOGIN_PATH).into_response()),
        }
    };

    Ok(Html(sheet.render(nav, &draft, toast)).into_response())
}

/// Local-only bulk edits. Returns false when `action` is not one of them.
fn apply_mark_all(action: &str, draft: &mut Draft) -> bool {
    match action {
        "mark_all_present" => draft.mark_all(Status::Present),
        "mark_all_absent" => draft.mark_all(Status::Absent),
        _ => return false,
    }
    true
}

fn reload_message(err: &AppError) -> String {
    match err {
        AppError::Api(e) => e.user_message(),
        other => other.to_string(),
    }
}

enum Saved {
    Toast(Toast),
    LoggedOut,
}

async fn save(state: &AppState, sheet: &Sheet, draft: &Draft) -> Saved {
    let Some(class_id) = sheet.class_id else {
        return Saved::Toast(Toast::error("Select a class first"));
    };
    if draft.is_empty() {
        return Saved::Toast(Toast::error("No students in this class"));
    }
    let Some(subject_id) = sheet.subject_id else {
        return Saved::Toast(Toast::error("Select a subject first"));
    };

    let key = SessionKey::new(class_id, sheet.date);
    let Some(guard) = state.saving.try_begin(key) else {
        tracing::info!(class_id, date = %sheet.date, "Save already in progress");
        return Saved::Toast(Toast::info(
            "Attendance for this class and date is already being saved",
        ));
    };

    // Detached so a closed browser tab cannot abort a half-finished save.
    let reconciler = state.reconciler.clone();
    let task_draft = draft.clone();
    let task = tokio::spawn(async move {
        let _guard = guard;
        reconciler.reconcile(key, Some(subject_id), &task_draft).await
    });

    match task.await {
        Ok(Ok(_session_id)) => Saved::Toast(Toast::success(format!(
            "Attendance saved: {} of {} present",
            draft.present_count(),
            draft.len()
        ))),
        Ok(Err(e)) if e.is_unauthorized() => Saved::LoggedOut,
        Ok(Err(e)) => Saved::Toast(Toast::error(e.user_message())),
        Err(e) => {
            tracing::error!("Attendance save task failed: {}", e);
            Saved::Toast(Toast::error("Saving attendance failed, please try again"))
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route(PAGE, get(take_attendance).post(submit_attendance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn posted_roster_comes_from_status_fields() {
        let posted = form(&[
            ("class_id", "12"),
            ("status_2", "ABSENT"),
            ("name_2", "Meera"),
            ("roll_2", "02"),
            ("status_1", "PRESENT"),
            ("name_1", "Ravi"),
            ("status_x", "PRESENT"),
        ]);
        let roster = posted_roster(&posted);
        let ids: Vec<i64> = roster.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(roster[0].name.as_deref(), Some("Ravi"));
        assert_eq!(roster[0].roll_number, None);
        assert_eq!(roster[1].roll_number.as_deref(), Some("02"));
    }

    #[test]
    fn posted_sheet_keeps_selection() {
        let posted = form(&[("status_1", "PRESENT")]);
        let sheet = Sheet::posted(
            Some(12),
            NaiveDate::from_ymd_opt(2024, 3, 1),
            Some(3),
            &posted,
        );
        assert_eq!(sheet.classes.len(), 1);
        assert_eq!(sheet.subjects[0].subject_id, 3);
        let draft = Draft::from_form(&sheet.roster, &posted);
        assert!(draft.is_present(1));
    }

    #[test]
    fn mark_all_is_the_only_local_action() {
        let mut draft = Draft::from_roster(&posted_roster(&form(&[("status_1", "ABSENT")])));
        assert!(apply_mark_all("mark_all_present", &mut draft));
        assert_eq!(draft.present_count(), 1);
        assert!(!apply_mark_all("save", &mut draft));
        assert_eq!(draft.present_count(), 1);
    }
}
