//! Role-tagged input columns.
//!
//! A [`DataTable`] is a set of columns aligned by row index. Each column
//! carries the role it plays for the task model; a table without a
//! [`Role::Task`] column has no rows.

use crate::milestones::MilestoneStyle;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use ganttline_core::SortDirection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a column contributes to a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Task,
    Parent,
    StartDate,
    EndDate,
    Duration,
    Completion,
    Resource,
    Milestones,
    Legend,
    ExtraInformation,
    TaskColor,
}

impl Role {
    pub fn is_date(self) -> bool {
        matches!(self, Role::StartDate | Role::EndDate)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Role::Duration | Role::Completion)
    }
}

/// Date layouts accepted for text cells in date roles
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// A single typed cell
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Bool(bool),
}

static NULL_CELL: CellValue = CellValue::Null;

impl CellValue {
    /// Coerce raw text for a column of the given role.
    ///
    /// Blank text is null. Date roles try the date layouts first, numeric
    /// roles try a float; anything unrecognised stays text.
    pub fn parse_for(role: Role, raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if role.is_date() {
            if let Some(at) = parse_date_time(trimmed) {
                return CellValue::DateTime(at);
            }
        }
        if role.is_numeric() {
            if let Ok(n) = trimmed.parse::<f64>() {
                return CellValue::Number(n);
            }
        }
        CellValue::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Display text; `None` for null or blank
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::DateTime(at) => Some(at.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    /// Finite numeric value, parsing text when needed
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse().ok()?,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::Null | CellValue::DateTime(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Date-time value; numbers are read as Unix epoch milliseconds
    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(at) => Some(*at),
            CellValue::Number(ms) if ms.is_finite() => {
                DateTime::from_timestamp_millis(*ms as i64).map(|d| d.naive_utc())
            }
            CellValue::Text(s) => parse_date_time(s.trim()),
            _ => None,
        }
    }
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.naive_utc());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// One role-tagged column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub role: Role,
    /// Header text, used as the key of extra-information values
    pub display_name: String,
    pub values: Vec<CellValue>,
    /// Sort requested on this column
    pub sort: Option<SortDirection>,
}

impl Column {
    pub fn new(role: Role, display_name: impl Into<String>) -> Self {
        Self {
            role,
            display_name: display_name.into(),
            values: Vec::new(),
            sort: None,
        }
    }

    /// Set the cell values
    pub fn values(mut self, values: impl IntoIterator<Item = CellValue>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    /// Set text cells, blank strings becoming null
    pub fn texts<S: AsRef<str>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        let role = self.role;
        self.values = values
            .into_iter()
            .map(|s| CellValue::parse_for(role, s.as_ref()))
            .collect();
        self
    }

    /// Request a sort on this column
    pub fn sorted(mut self, direction: SortDirection) -> Self {
        self.sort = Some(direction);
        self
    }

    /// Cell at `row`; short columns read as null
    pub fn get(&self, row: usize) -> &CellValue {
        self.values.get(row).unwrap_or(&NULL_CELL)
    }
}

/// Columns aligned by row index
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<Column>,
    /// Milestone style carried by individual rows
    pub milestone_styles: BTreeMap<usize, MilestoneStyle>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Attach a milestone style to a row
    pub fn milestone_style(mut self, row: usize, style: MilestoneStyle) -> Self {
        self.milestone_styles.insert(row, style);
        self
    }

    /// First column with the given role
    pub fn first(&self, role: Role) -> Option<&Column> {
        self.columns.iter().find(|c| c.role == role)
    }

    /// All columns with the given role, in table order
    pub fn all(&self, role: Role) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.role == role)
    }

    /// Cell of the first column with `role`; null when there is none
    pub fn cell(&self, role: Role, row: usize) -> &CellValue {
        self.first(role).map_or(&NULL_CELL, |c| c.get(row))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.first(role).is_some()
    }

    /// Number of rows: the length of the task column
    pub fn row_count(&self) -> usize {
        self.first(Role::Task).map_or(0, |c| c.values.len())
    }

    /// Sort signalled on the task or parent column
    pub fn sort_direction(&self) -> Option<SortDirection> {
        self.columns
            .iter()
            .filter(|c| matches!(c.role, Role::Task | Role::Parent))
            .find_map(|c| c.sort)
    }
}
