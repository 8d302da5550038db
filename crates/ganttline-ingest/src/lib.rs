//! # ganttline-ingest
//!
//! Turns role-tagged input columns into typed [`Task`] records.
//!
//! This crate provides:
//! - The input table model ([`DataTable`], [`Column`], [`CellValue`], [`Role`])
//! - Attribute resolution: start/end dates, duration, completion, color
//! - The dataset-wide duration unit downgrade ([`duration`])
//! - Legend categories and the milestone style registry
//!
//! ## Example
//!
//! ```rust
//! use ganttline_core::{FixedClock, Settings};
//! use ganttline_ingest::{ingest, Column, DataTable, Role};
//!
//! let table = DataTable::new()
//!     .column(Column::new(Role::Task, "Task").texts(["Design", "Build"]))
//!     .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-04"]))
//!     .column(Column::new(Role::Duration, "Duration").texts(["3", "1.5"]));
//!
//! let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let clock = FixedClock(now);
//! let ingested = ingest(&table, &Settings::default(), &clock);
//! assert_eq!(ingested.tasks.len(), 2);
//! assert_eq!(ingested.tasks[1].duration, 36.0); // hours
//! ```

pub mod attributes;
pub mod duration;
pub mod milestones;
pub mod palette;
pub mod table;

pub use milestones::{MilestoneDataPoint, MilestoneRegistry, MilestoneStyle};
pub use palette::{Legend, LegendEntry};
pub use table::{CellValue, Column, DataTable, Role};

use attributes::{resolve_color, ColorMode, CompletionScale};
use chrono::NaiveDateTime;
use duration::{plan_downgrade, UnitPlan};
use ganttline_core::calendar::{end_date, settle_days_off};
use ganttline_core::{
    Clock, Color, DurationUnit, ExtraInformation, Milestone, Settings, SortDirection, Task, TaskId,
};
use palette::Palette;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// Output
// ============================================================================

/// Which optional roles the table provides
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePresence {
    pub parent: bool,
    pub duration: bool,
    pub end_date: bool,
    pub completion: bool,
    pub resource: bool,
    pub milestones: bool,
    pub legend: bool,
}

impl RolePresence {
    pub fn of(table: &DataTable) -> Self {
        Self {
            parent: table.has_role(Role::Parent),
            duration: table.has_role(Role::Duration),
            end_date: table.has_role(Role::EndDate),
            completion: table.has_role(Role::Completion),
            resource: table.has_role(Role::Resource),
            milestones: table.has_role(Role::Milestones),
            legend: table.has_role(Role::Legend),
        }
    }
}

/// Tasks in row order plus the dataset-level facts derived with them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingested {
    pub tasks: Vec<Task>,
    /// Unit every task duration is expressed in
    pub duration_unit: DurationUnit,
    pub legend: Legend,
    pub milestones: MilestoneRegistry,
    /// Custom name sort requested by the table
    pub sort: Option<SortDirection>,
    pub roles: RolePresence,
}

impl Ingested {
    pub fn empty(duration_unit: DurationUnit) -> Self {
        Self {
            tasks: Vec::new(),
            duration_unit,
            legend: Legend::default(),
            milestones: MilestoneRegistry::new(),
            sort: None,
            roles: RolePresence::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Values read from one row before the dataset unit is known
struct RowDraft {
    id: TaskId,
    name: String,
    parent: Option<String>,
    start: NaiveDateTime,
    explicit_end: Option<NaiveDateTime>,
    duration: Option<f64>,
}

/// Build one task per row.
///
/// A table without a task column yields an empty result. Rows without a
/// usable start date start at `clock.now()`.
pub fn ingest(table: &DataTable, settings: &Settings, clock: &dyn Clock) -> Ingested {
    let configured = settings.general.duration_unit;
    if !table.has_role(Role::Task) {
        debug!("no task column, nothing to ingest");
        return Ingested::empty(configured);
    }

    let roles = RolePresence::of(table);
    let rows = table.row_count();
    let duration_min = settings.general.duration_min;
    let now = clock.now();

    // Pass 1: raw values
    let drafts: Vec<RowDraft> = (0..rows)
        .map(|row| RowDraft {
            id: row,
            name: table.cell(Role::Task, row).as_text().unwrap_or_default(),
            parent: table.cell(Role::Parent, row).as_text(),
            start: table.cell(Role::StartDate, row).as_date_time().unwrap_or(now),
            explicit_end: table.cell(Role::EndDate, row).as_date_time(),
            duration: table
                .cell(Role::Duration, row)
                .as_number()
                .map(|d| d.max(duration_min)),
        })
        .collect();

    let durations = drafts.iter().map(|d| d.duration.unwrap_or(duration_min));
    let plan = plan_downgrade(durations, configured);
    if plan.is_downgraded() {
        debug!(from = %configured, to = %plan.unit(), "fractional durations, downgrading unit");
    }

    let mut palette = Palette::new(settings.legend.colors.clone());
    let (legend, mode) = build_legend(table, &roles, &mut palette);

    let observed_max = table
        .first(Role::Completion)
        .into_iter()
        .flat_map(|c| c.values.iter())
        .filter_map(CellValue::as_number)
        .reduce(f64::max);
    let completion = CompletionScale::new(settings.task_completion.max_completion, observed_max);

    let mut registry = MilestoneRegistry::new();
    let fill = settings.task_config.fill;

    // Pass 2: resolve in the dataset unit
    let tasks = drafts
        .into_iter()
        .map(|draft| {
            let row = draft.id;
            let mut task = schedule(draft, &plan, settings, roles.duration);

            if settings.task_completion.show {
                task.completion = completion.resolve(table.cell(Role::Completion, row).as_number());
            }

            task.task_type = table.cell(Role::Legend, row).as_text();
            let color = resolve_color(
                mode,
                row_override_color(table, row),
                task.task_type.as_deref(),
                &mut palette,
                fill,
            );
            task.color = color;
            task.default_color = color;

            task.resource = table.cell(Role::Resource, row).as_text().unwrap_or_default();
            task.extra_information = table
                .all(Role::ExtraInformation)
                .filter_map(|column| {
                    column.get(row).as_text().map(|value| ExtraInformation {
                        name: column.display_name.clone(),
                        value,
                    })
                })
                .collect();

            if let Some(kind) = table.cell(Role::Milestones, row).as_text() {
                registry.observe(&kind, table.milestone_styles.get(&row), fill);
                task.milestones.push(Milestone {
                    kind,
                    start: task.start,
                    category: task.name.clone(),
                });
            }
            task
        })
        .collect::<Vec<_>>();

    debug!(rows = tasks.len(), unit = %plan.unit(), "ingested task rows");

    Ingested {
        tasks,
        duration_unit: plan.unit(),
        legend,
        milestones: registry,
        sort: table.sort_direction(),
        roles,
    }
}

/// Resolve the schedule of one row: end date, duration and days off.
///
/// Days off push the end out only when the table carries a duration column.
fn schedule(draft: RowDraft, plan: &UnitPlan, settings: &Settings, has_duration: bool) -> Task {
    let unit = plan.unit();
    let start = draft.start;
    let derived = plan.transform(draft.duration.unwrap_or(settings.general.duration_min));

    // An explicit end only drives the bar when it spans at least one unit
    let explicit = match (draft.duration, draft.explicit_end) {
        (None, Some(end)) if (end - start).num_milliseconds() >= unit.millis() => Some(end),
        _ => None,
    };
    let (mut end, duration, extends) = match explicit {
        Some(end) => (end, unit.from_millis((end - start).num_milliseconds()), false),
        None => (end_date(unit, start, derived), derived, has_duration),
    };

    let mut days_off = Vec::new();
    if settings.days_off.show {
        let first_day = settings.days_off.first_day_of_week;
        let settled = settle_days_off(start, end, duration, unit, first_day, extends);
        end = settled.end;
        days_off = settled.days_off;
    }
    if end < start {
        end = start;
    }

    let mut task = Task::new(draft.id, draft.name, start, end).duration(duration);
    task.parent = draft.parent;
    task.was_downgrade_duration_unit = plan.is_downgraded();
    task.step_duration_transformation = plan.steps;
    task.days_off = days_off;
    task
}

/// Legend categories in first-seen order and the color mode they imply
fn build_legend(
    table: &DataTable,
    roles: &RolePresence,
    palette: &mut Palette,
) -> (Legend, ColorMode) {
    let Some(column) = table.first(Role::Legend) else {
        let mode = if roles.duration || roles.end_date {
            ColorMode::ByCategory
        } else {
            ColorMode::Single
        };
        return (Legend::default(), mode);
    };

    let mut labels: Vec<String> = Vec::new();
    for value in column.values.iter().filter_map(CellValue::as_text) {
        if !labels.contains(&value) {
            labels.push(value);
        }
    }

    if !roles.duration && !roles.end_date && labels.len() <= 1 {
        return (Legend::default(), ColorMode::Single);
    }

    let legend = Legend {
        title: Some(column.display_name.clone()),
        entries: labels
            .into_iter()
            .map(|label| LegendEntry {
                color: palette.color_for(&label),
                label,
            })
            .collect(),
    };
    (legend, ColorMode::ByCategory)
}

fn row_override_color(table: &DataTable, row: usize) -> Option<Color> {
    let raw = table.cell(Role::TaskColor, row).as_text()?;
    match raw.parse::<Color>() {
        Ok(color) => Some(color),
        Err(err) => {
            warn!(row, %err, "ignoring task color override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ganttline_core::{DayOff, FixedClock, MilestoneShape};
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(at(2030, 6, 1, 12))
    }

    fn table(names: &[&str]) -> DataTable {
        DataTable::new().column(Column::new(Role::Task, "Task").texts(names.iter().copied()))
    }

    #[test]
    fn missing_task_column_is_empty() {
        let table = DataTable::new().column(Column::new(Role::Duration, "Duration").texts(["3"]));
        let ingested = ingest(&table, &Settings::default(), &clock());
        assert!(ingested.is_empty());
        assert_eq!(ingested.duration_unit, DurationUnit::Day);
    }

    #[test]
    fn duration_drives_end_date() {
        let table = table(&["A", "B"])
            .column(Column::new(Role::Parent, "Parent").texts(["", "A"]))
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-01"]))
            .column(Column::new(Role::Duration, "Duration").texts(["3", "1"]));
        let ingested = ingest(&table, &Settings::default(), &clock());

        let a = &ingested.tasks[0];
        assert_eq!(a.id, 0);
        assert_eq!(a.end, at(2024, 1, 4, 0));
        assert_eq!(a.duration, 3.0);
        assert_eq!(a.parent, None);
        assert_eq!(ingested.tasks[1].parent.as_deref(), Some("A"));
        assert!(ingested.roles.parent);
    }

    #[test]
    fn missing_start_uses_clock() {
        let ingested = ingest(&table(&["A"]), &Settings::default(), &clock());
        let task = &ingested.tasks[0];
        assert_eq!(task.start, at(2030, 6, 1, 12));
        assert_eq!(task.end, at(2030, 6, 2, 12));
        assert_eq!(task.duration, 1.0);
    }

    #[test]
    fn duration_is_at_least_the_minimum() {
        let table = table(&["A"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01"]))
            .column(Column::new(Role::Duration, "Duration").texts(["0"]));
        let mut settings = Settings::default();
        settings.general.duration_min = 2.0;
        let ingested = ingest(&table, &settings, &clock());
        assert_eq!(ingested.tasks[0].duration, 2.0);
        assert_eq!(ingested.tasks[0].end, at(2024, 1, 3, 0));
    }

    #[test]
    fn explicit_end_date() {
        let table = table(&["A", "B"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-01 08:00"]))
            .column(Column::new(Role::EndDate, "End").texts(["2024-01-05", "2024-01-01 10:00"]));
        let ingested = ingest(&table, &Settings::default(), &clock());

        assert_eq!(ingested.tasks[0].end, at(2024, 1, 5, 0));
        assert_eq!(ingested.tasks[0].duration, 4.0);
        // Shorter than one day: recomputed from the minimum duration
        assert_eq!(ingested.tasks[1].end, at(2024, 1, 2, 8));
    }

    #[test]
    fn fractional_duration_downgrades_every_row() {
        let table = table(&["A", "B"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-01"]))
            .column(Column::new(Role::Duration, "Duration").texts(["2", "1.5"]));
        let ingested = ingest(&table, &Settings::default(), &clock());

        assert_eq!(ingested.duration_unit, DurationUnit::Hour);
        assert_eq!(ingested.tasks[0].duration, 48.0);
        assert_eq!(ingested.tasks[1].duration, 36.0);
        assert_eq!(ingested.tasks[1].end, at(2024, 1, 2, 12));
        assert!(ingested.tasks.iter().all(|t| t.was_downgrade_duration_unit));
        assert!(ingested.tasks.iter().all(|t| t.step_duration_transformation == 1));
    }

    #[test]
    fn completion_scaled_from_data() {
        let table = table(&["A", "B", "C"])
            .column(Column::new(Role::Completion, "Done").texts(["50", "0", ""]));
        let ingested = ingest(&table, &Settings::default(), &clock());
        let completion: Vec<_> = ingested.tasks.iter().map(|t| t.completion).collect();
        assert_eq!(completion, vec![Some(0.5), None, None]);

        let mut settings = Settings::default();
        settings.task_completion.show = false;
        let ingested = ingest(&table, &settings, &clock());
        assert!(ingested.tasks.iter().all(|t| t.completion.is_none()));
    }

    #[test]
    fn colors_follow_precedence() {
        let table = table(&["A", "B", "C", "D"])
            .column(Column::new(Role::Duration, "Duration").texts(["1", "1", "1", "1"]))
            .column(Column::new(Role::Legend, "Type").texts(["x", "y", "x", ""]))
            .column(Column::new(Role::TaskColor, "Color").texts(["#FF0000", "", "not a color", ""]));
        let ingested = ingest(&table, &Settings::default(), &clock());

        assert_eq!(ingested.tasks[0].color, Color::rgb(255, 0, 0));
        assert_eq!(ingested.tasks[1].color, palette::DEFAULT_PALETTE[1]);
        assert_eq!(ingested.tasks[2].color, palette::DEFAULT_PALETTE[0]);
        assert_eq!(ingested.tasks[3].color, Color::default());
        assert_eq!(ingested.tasks[2].task_type.as_deref(), Some("x"));

        assert_eq!(ingested.legend.title.as_deref(), Some("Type"));
        let labels: Vec<_> = ingested.legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["x", "y"]);
        assert_eq!(ingested.legend.color_of("x"), Some(palette::DEFAULT_PALETTE[0]));
    }

    #[test]
    fn legend_suppressed_without_schedule_roles() {
        let table = table(&["A", "B"]).column(Column::new(Role::Legend, "Type").texts(["x", "x"]));
        let ingested = ingest(&table, &Settings::default(), &clock());
        assert!(ingested.legend.is_empty());
        assert!(ingested.tasks.iter().all(|t| t.color == Color::default()));
    }

    #[test]
    fn milestones_and_extra_information() {
        let table = table(&["A", "B"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-02"]))
            .column(Column::new(Role::Milestones, "Milestone").texts(["Review", "Review"]))
            .column(Column::new(Role::ExtraInformation, "Owner").texts(["Ana", ""]))
            .milestone_style(1, MilestoneStyle { shape: Some(MilestoneShape::Circle), color: None });
        let ingested = ingest(&table, &Settings::default(), &clock());

        let a = &ingested.tasks[0];
        assert_eq!(a.milestones.len(), 1);
        assert_eq!(a.milestones[0].start, at(2024, 1, 1, 0));
        assert_eq!(a.milestones[0].category, "A");
        assert_eq!(a.extra_information, vec![ExtraInformation { name: "Owner".into(), value: "Ana".into() }]);
        assert!(ingested.tasks[1].extra_information.is_empty());

        assert_eq!(ingested.milestones.len(), 1);
        assert_eq!(ingested.milestones.get("Review").unwrap().shape, MilestoneShape::Circle);
    }

    #[test]
    fn days_off_extend_duration_driven_rows() {
        let table = table(&["A"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01"]))
            .column(Column::new(Role::Duration, "Duration").texts(["6"]));
        let settings = Settings::default().show_days_off(1);
        let ingested = ingest(&table, &settings, &clock());

        let task = &ingested.tasks[0];
        assert_eq!(task.end, at(2024, 1, 9, 0));
        assert_eq!(task.days_off, vec![DayOff::new(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(), 2)]);
    }

    #[test]
    fn days_off_do_not_move_explicit_ends() {
        let table = table(&["A"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01"]))
            .column(Column::new(Role::EndDate, "End").texts(["2024-01-10"]));
        let settings = Settings::default().show_days_off(1);
        let ingested = ingest(&table, &settings, &clock());
        assert_eq!(ingested.tasks[0].end, at(2024, 1, 10, 0));
        assert_eq!(ingested.tasks[0].days_off.len(), 1);
    }

    #[test]
    fn days_off_without_duration_column_keep_minimum_end() {
        let table = table(&["A"])
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-05 12:00"]));
        let settings = Settings::default().show_days_off(1);
        let ingested = ingest(&table, &settings, &clock());

        let task = &ingested.tasks[0];
        assert_eq!(task.end, at(2024, 1, 6, 12));
        assert_eq!(task.days_off, vec![DayOff::new(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(), 2)]);
    }

    #[test]
    fn sort_signal_is_carried() {
        let table = DataTable::new()
            .column(Column::new(Role::Task, "Task").texts(["B", "A"]).sorted(SortDirection::Ascending));
        let ingested = ingest(&table, &Settings::default(), &clock());
        assert_eq!(ingested.sort, Some(SortDirection::Ascending));
    }
}
