use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::Principal;

/// Response envelope used by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Error body, decoded separately so that a failure response with an
/// unexpected `data` shape still yields its message.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A data array together with the backend's total row count, if reported.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub access_token: String,
    pub user: Principal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl ClassSummary {
    pub fn label(&self) -> String {
        match self.section.as_deref() {
            Some(section) if !section.is_empty() => format!("{} - {}", self.name, section),
            _ => self.name.clone(),
        }
    }
}

/// Roster entry for a class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Student {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "roll_no")]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminStudent {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Teacher {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminAnalytics {
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_teachers: u64,
    #[serde(default)]
    pub sessions_last_30: u64,
    #[serde(default)]
    pub avg_attendance_last_30: f64,
}

/// A subject the teacher takes for one class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Assignment {
    pub class_id: i64,
    pub subject_id: i64,
    #[serde(default)]
    pub subject_name: Option<String>,
}

impl Assignment {
    pub fn subject_label(&self) -> String {
        self.subject_name
            .clone()
            .unwrap_or_else(|| format!("Subject {}", self.subject_id))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeacherDashboard {
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub today_attendance_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub class_id: i64,
    pub session_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedSession {
    pub session_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    pub id: i64,
    pub class_id: i64,
    pub session_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    pub student_id: i64,
    pub status: crate::attendance::Status,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub present: u32,
    pub total_sessions: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyRow {
    pub month: u32,
    pub present: u32,
    pub total_sessions: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Defaulter {
    pub student_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roll: Option<String>,
    pub presents: u32,
    pub total_sessions: u32,
    pub percent: u32,
}

/// One student's attendance history as seen by a teacher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentReport {
    #[serde(default)]
    pub basic_info: Option<StudentInfo>,
    #[serde(default)]
    pub summary: StudentTotals,
    #[serde(default)]
    pub monthly_trend: Vec<MonthPercent>,
    #[serde(default)]
    pub subject_performance: Vec<SubjectPercent>,
    #[serde(default)]
    pub calendar: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roll: Option<String>,
    #[serde(default)]
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentTotals {
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub presents: u32,
    #[serde(default)]
    pub percent: u32,
    #[serde(default)]
    pub risk: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthPercent {
    pub month: u32,
    pub percent: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectPercent {
    pub subject: String,
    pub percent: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub status: crate::attendance::Status,
    #[serde(default)]
    pub subject_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceSummary {
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub present: u32,
    #[serde(default)]
    pub absent: u32,
    #[serde(default)]
    pub percentage: f64,
}
