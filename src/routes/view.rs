//! View models shared by the page templates.

use askama::Template;

use crate::api::types::ClassSummary;
use crate::auth::{Principal, Role};

#[derive(Debug, Clone)]
pub struct NavLink {
    pub href: String,
    pub label: String,
}

impl NavLink {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user: Option<String>,
    pub links: Vec<NavLink>,
}

impl Nav {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_principal(principal: &Principal) -> Self {
        let links = match principal.role {
            Some(Role::Admin) => vec![
                NavLink::new("/admin", "Dashboard"),
                NavLink::new("/admin/classes", "Classes"),
                NavLink::new("/admin/students", "Students"),
                NavLink::new("/admin/teachers", "Teachers"),
                NavLink::new("/admin/analytics", "Analytics"),
            ],
            Some(Role::Teacher) => vec![
                NavLink::new("/teacher", "Dashboard"),
                NavLink::new("/teacher/take-attendance", "Take attendance"),
                NavLink::new("/teacher/reports", "Defaulters"),
                NavLink::new("/teacher/reports/daily", "Daily"),
                NavLink::new("/teacher/reports/monthly", "Monthly"),
            ],
            Some(Role::Student) => vec![
                NavLink::new("/student", "Dashboard"),
                NavLink::new("/student/attendance", "My attendance"),
            ],
            None => Vec::new(),
        };
        let who = match principal.role {
            Some(role) => format!("{} ({})", principal.name, role),
            None => principal.name.clone(),
        };
        Self {
            user: Some(who),
            links,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: &'static str,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: "info",
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn class_options(classes: &[ClassSummary], selected: Option<i64>) -> Vec<SelectOption> {
    classes
        .iter()
        .map(|c| SelectOption {
            value: c.id.to_string(),
            label: c.label(),
            selected: Some(c.id) == selected,
        })
        .collect()
}

/// One input of a page's filter form.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub input_type: &'static str,
    pub value: String,
    pub options: Vec<SelectOption>,
}

impl Field {
    pub fn input(name: &str, label: &str, input_type: &'static str, value: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            input_type,
            value: value.to_string(),
            options: Vec::new(),
        }
    }

    pub fn select(name: &str, label: &str, options: Vec<SelectOption>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            input_type: "select",
            value: String::new(),
            options,
        }
    }

    pub fn is_select(&self) -> bool {
        self.input_type == "select"
    }
}

/// A headed table.
#[derive(Debug, Clone, Default)]
pub struct Section {
    pub heading: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Per-row target for the first cell; empty means plain text.
    pub links: Vec<String>,
    pub empty: String,
}

impl Section {
    pub fn new(heading: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            heading: heading.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            links: Vec::new(),
            empty: "Nothing to show".to_string(),
        }
    }

    pub fn empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty = text.into();
        self
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.linked_row(String::new(), cells);
    }

    /// A row whose first cell links to `href`.
    pub fn linked_row<I, S>(&mut self, href: impl Into<String>, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows.push(cells.into_iter().map(|c| c.to_string()).collect());
        self.links.push(href.into());
    }

    pub fn link_at(&self, row: usize) -> &str {
        self.links.get(row).map(String::as_str).unwrap_or("")
    }
}

/// Generic dashboard/report page: optional filter form, download links and
/// any number of tables.
#[derive(Template)]
#[template(path = "pages/report.html")]
pub struct ReportPage {
    pub nav: Nav,
    pub toast: Option<Toast>,
    pub title: String,
    pub subtitle: String,
    pub filter_action: String,
    pub filters: Vec<Field>,
    pub downloads: Vec<NavLink>,
    pub sections: Vec<Section>,
}

impl ReportPage {
    pub fn new(principal: &Principal, title: impl Into<String>) -> Self {
        Self {
            nav: Nav::for_principal(principal),
            toast: None,
            title: title.into(),
            subtitle: String::new(),
            filter_action: String::new(),
            filters: Vec::new(),
            downloads: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn subtitle(mut self, text: impl Into<String>) -> Self {
        self.subtitle = text.into();
        self
    }

    pub fn filters(mut self, action: impl Into<String>, fields: Vec<Field>) -> Self {
        self.filter_action = action.into();
        self.filters = fields;
        self
    }

    pub fn download(mut self, link: NavLink) -> Self {
        self.downloads.push(link);
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn toast(mut self, toast: Toast) -> Self {
        self.toast = Some(toast);
        self
    }
}
