//! # ganttline-core
//!
//! Core task model for the ganttline layout engine.
//!
//! This crate provides:
//! - Domain types: `Task`, `GroupedTask`, `Milestone`, `DayOff`, `TaskCoordinates`
//! - Closed enums for duration units, axis granularity and glyph shapes
//! - The duration and calendar engine ([`calendar`])
//! - Color parsing and shading ([`color`])
//! - Engine configuration ([`settings`])
//! - The [`Clock`] seam used for the "now" fallback
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use ganttline_core::{calendar, DurationUnit};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let end = calendar::end_date(DurationUnit::Day, start, 3.0);
//! assert_eq!(end.date(), NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
//! ```

pub mod calendar;
pub mod color;
pub mod settings;

pub use color::Color;
pub use settings::Settings;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Type Aliases & Constants
// ============================================================================

/// Stable identifier of a task: the ordinal of the row it was built from
pub type TaskId = usize;

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Color used when neither an override nor a palette entry applies
pub const DEFAULT_TASK_COLOR: &str = "#00B099";

// ============================================================================
// Duration Units
// ============================================================================

/// Granularity used for duration arithmetic.
///
/// Ordered from finest to coarsest, so `a < b` means `a` is finer than `b`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Second,
    Minute,
    Hour,
    #[default]
    Day,
}

impl DurationUnit {
    /// Position in the downgrade ladder (second = 0 .. day = 3)
    pub fn rank(self) -> u32 {
        match self {
            DurationUnit::Second => 0,
            DurationUnit::Minute => 1,
            DurationUnit::Hour => 2,
            DurationUnit::Day => 3,
        }
    }

    /// Length of one unit in milliseconds
    pub fn millis(self) -> i64 {
        match self {
            DurationUnit::Second => MILLIS_PER_SECOND,
            DurationUnit::Minute => MILLIS_PER_MINUTE,
            DurationUnit::Hour => MILLIS_PER_HOUR,
            DurationUnit::Day => MILLIS_PER_DAY,
        }
    }

    /// The next finer unit, if any
    pub fn finer(self) -> Option<Self> {
        match self {
            DurationUnit::Second => None,
            DurationUnit::Minute => Some(DurationUnit::Second),
            DurationUnit::Hour => Some(DurationUnit::Minute),
            DurationUnit::Day => Some(DurationUnit::Hour),
        }
    }

    /// Walk `steps` notches towards seconds, stopping at the finest unit
    pub fn downgraded(self, steps: u32) -> Self {
        let mut unit = self;
        for _ in 0..steps {
            match unit.finer() {
                Some(next) => unit = next,
                None => break,
            }
        }
        unit
    }

    /// Number of `steps`-finer units contained in one unit of `self`
    pub fn conversion_factor(self, steps: u32) -> f64 {
        (self.millis() / self.downgraded(steps).millis()) as f64
    }

    /// Express a number of days in this unit
    pub fn from_days(self, days: f64) -> f64 {
        days * (MILLIS_PER_DAY / self.millis()) as f64
    }

    /// Express a millisecond span in this unit
    pub fn from_millis(self, millis: i64) -> f64 {
        millis as f64 / self.millis() as f64
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DurationUnit::Second => "second",
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Day => "day",
        };
        f.write_str(name)
    }
}

/// Axis granularity, one tick per unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    Second,
    Minute,
    Hour,
    Day,
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl DateType {
    /// Nominal length of one tick in milliseconds
    pub fn millis(self) -> f64 {
        let year = 365.0 * MILLIS_PER_DAY as f64;
        match self {
            DateType::Second => MILLIS_PER_SECOND as f64,
            DateType::Minute => MILLIS_PER_MINUTE as f64,
            DateType::Hour => MILLIS_PER_HOUR as f64,
            DateType::Day => MILLIS_PER_DAY as f64,
            DateType::Week => 4.0 * MILLIS_PER_DAY as f64,
            DateType::Month => 30.0 * MILLIS_PER_DAY as f64,
            DateType::Quarter => year / 4.0,
            DateType::Year => year,
        }
    }
}

// ============================================================================
// Presentation Enums
// ============================================================================

/// Glyph drawn for a milestone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneShape {
    #[default]
    Rhombus,
    Circle,
    Square,
}

/// Where the resource label sits relative to its bar
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceLabelPosition {
    Top,
    #[default]
    Right,
    Inside,
}

/// Which bar edges a relationship line connects
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipPosition {
    StartToFinish,
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
}

/// Direction of the custom name sort
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

// ============================================================================
// Task
// ============================================================================

/// A run of consecutive non-working days starting at `start`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOff {
    /// First day of the block
    pub start: NaiveDate,
    /// Number of days in the block (1 or 2)
    pub days: u32,
}

impl DayOff {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    /// Day after the block ends, saturating at the last representable date
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_days(chrono::Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Whether `date` falls inside this block
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end()
    }
}

/// A milestone marker attached to a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Marker name, the key into the milestone style registry
    pub kind: String,
    /// Anchor date
    pub start: NaiveDateTime,
    /// Name of the owning task
    pub category: String,
}

/// A named value carried through from an extra-information column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraInformation {
    pub name: String,
    pub value: String,
}

/// One schedulable row after ingestion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Row ordinal
    pub id: TaskId,
    /// Display order, assigned once by the hierarchy builder
    pub index: Option<usize>,
    /// Display name, also the grouping key
    pub name: String,
    /// Name of the parent task
    pub parent: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Duration in the dataset's final unit
    pub duration: f64,
    /// Whether the duration was rescaled to a finer unit
    pub was_downgrade_duration_unit: bool,
    /// Number of notches the configured unit was downgraded by
    pub step_duration_transformation: u32,
    /// Completion in `[0, 1]`; `None` when there is nothing to draw
    pub completion: Option<f64>,
    pub color: Color,
    pub default_color: Color,
    pub resource: String,
    /// Legend category of the row
    pub task_type: Option<String>,
    pub extra_information: Vec<ExtraInformation>,
    /// Ids of the direct children
    pub children: Vec<TaskId>,
    /// False when any ancestor is collapsed
    pub visibility: bool,
    pub days_off: Vec<DayOff>,
    pub milestones: Vec<Milestone>,
}

impl Task {
    /// Create a task spanning `start..end` with the default color
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        let color = Color::default();
        Self {
            id,
            index: None,
            name: name.into(),
            parent: None,
            start,
            end,
            duration: 0.0,
            was_downgrade_duration_unit: false,
            step_duration_transformation: 0,
            completion: None,
            color,
            default_color: color,
            resource: String::new(),
            task_type: None,
            extra_information: Vec::new(),
            children: Vec::new(),
            visibility: true,
            days_off: Vec::new(),
            milestones: Vec::new(),
        }
    }

    /// Set the parent name
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the duration
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Set both the effective and the default color
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self.default_color = color;
        self
    }

    /// Set the resource label
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Set the completion fraction
    pub fn completion(mut self, completion: f64) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Attach a milestone at the task start
    pub fn milestone(mut self, kind: impl Into<String>) -> Self {
        self.milestones.push(Milestone {
            kind: kind.into(),
            start: self.start,
            category: self.name.clone(),
        });
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

// ============================================================================
// Grouped Rows & Coordinates
// ============================================================================

/// One rendered row standing for every task that shares a name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupedTask {
    /// Id of the first member task
    pub id: TaskId,
    pub name: String,
    /// Ancestor depth, 1 for roots; `None` when grouping is off
    pub level: Option<u32>,
    pub tasks: Vec<Task>,
    pub parent: Option<String>,
    /// Final display row
    pub index: usize,
}

/// Geometry of one rendered bar
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskCoordinates {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub task: TaskId,
}

// ============================================================================
// Clock
// ============================================================================

/// Source of the current time, used when a row carries no start date
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the local timezone
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock pinned to one instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while reading configuration or persisted state
#[derive(Debug, Error)]
pub enum GanttError {
    #[error("Invalid collapsed task list: {0}")]
    InvalidCollapsedList(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] toml::de::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn duration_unit_ladder() {
        assert_eq!(DurationUnit::Day.finer(), Some(DurationUnit::Hour));
        assert_eq!(DurationUnit::Second.finer(), None);
        assert_eq!(DurationUnit::Day.downgraded(2), DurationUnit::Minute);
        assert_eq!(DurationUnit::Minute.downgraded(5), DurationUnit::Second);
        assert!(DurationUnit::Second < DurationUnit::Day);
    }

    #[test]
    fn duration_unit_factors() {
        assert_eq!(DurationUnit::Day.conversion_factor(1), 24.0);
        assert_eq!(DurationUnit::Day.conversion_factor(2), 1440.0);
        assert_eq!(DurationUnit::Hour.conversion_factor(2), 3600.0);
        assert_eq!(DurationUnit::Hour.conversion_factor(0), 1.0);
        assert_eq!(DurationUnit::Minute.from_days(2.0), 2880.0);
    }

    #[test]
    fn date_type_week_is_four_days() {
        assert_eq!(DateType::Week.millis(), 4.0 * MILLIS_PER_DAY as f64);
        assert_eq!(DateType::Quarter.millis() * 4.0, DateType::Year.millis());
    }

    #[test]
    fn task_builder() {
        let task = Task::new(3, "Design", at(2024, 1, 1), at(2024, 1, 4))
            .parent("Phase 1")
            .duration(3.0)
            .resource("Ana")
            .milestone("Kickoff");

        assert_eq!(task.id, 3);
        assert_eq!(task.parent.as_deref(), Some("Phase 1"));
        assert_eq!(task.resource, "Ana");
        assert_eq!(task.milestones.len(), 1);
        assert_eq!(task.milestones[0].category, "Design");
        assert!(task.visibility);
        assert!(!task.has_children());
    }

    #[test]
    fn day_off_coverage() {
        let block = DayOff::new(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(), 2);
        assert!(block.covers(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()));
        assert!(!block.covers(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));
        assert_eq!(block.end(), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());

        let last = DayOff::new(NaiveDate::MAX, 2);
        assert_eq!(last.end(), NaiveDate::MAX);
    }

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock(at(2024, 3, 1));
        assert_eq!(clock.now(), clock.now());
    }
}
