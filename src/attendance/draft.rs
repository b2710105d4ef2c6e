use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::types::{RecordInput, Student};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "PRESENT",
            Status::Absent => "ABSENT",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Status::Present => Status::Absent,
            Status::Absent => Status::Present,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(Status::Present),
            "ABSENT" => Ok(Status::Absent),
            other => Err(format!("invalid attendance status: {:?}", other)),
        }
    }
}

/// Form field carrying one student's status.
pub fn field_name(student_id: i64) -> String {
    format!("status_{}", student_id)
}

/// Unsaved per-student statuses for one class and date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    entries: BTreeMap<i64, Status>,
}

impl Draft {
    /// Every student of a freshly loaded roster starts absent.
    pub fn from_roster(roster: &[Student]) -> Self {
        Self {
            entries: roster.iter().map(|s| (s.id, Status::Absent)).collect(),
        }
    }

    /// Rebuild a draft from submitted form fields. Only roster students are
    /// kept; a missing or unreadable field counts as absent.
    pub fn from_form(roster: &[Student], form: &HashMap<String, String>) -> Self {
        let entries = roster
            .iter()
            .map(|s| {
                let status = form
                    .get(&field_name(s.id))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(Status::Absent);
                (s.id, status)
            })
            .collect();
        Self { entries }
    }

    pub fn status(&self, student_id: i64) -> Option<Status> {
        self.entries.get(&student_id).copied()
    }

    pub fn is_present(&self, student_id: i64) -> bool {
        self.status(student_id) == Some(Status::Present)
    }

    pub fn set(&mut self, student_id: i64, status: Status) {
        self.entries.insert(student_id, status);
    }

    /// Flip one student; unknown students are ignored.
    pub fn toggle(&mut self, student_id: i64) {
        if let Some(status) = self.entries.get_mut(&student_id) {
            *status = status.flipped();
        }
    }

    pub fn mark_all(&mut self, status: Status) {
        for value in self.entries.values_mut() {
            *value = status;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| **s == Status::Present)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, Status)> + '_ {
        self.entries.iter().map(|(id, status)| (*id, *status))
    }

    /// Request body for the records upsert.
    pub fn to_records(&self) -> Vec<RecordInput> {
        self.iter()
            .map(|(student_id, status)| RecordInput { student_id, status })
            .collect()
    }
}
