//! Coordinate engine.
//!
//! Turns the rendered rows into plain geometry: bars, progress stops,
//! milestone glyphs, day-off overlays, resource labels, row labels and
//! relationship links. Everything is returned as a fresh [`ChartLayout`]
//! per recompute; nothing here draws.

use crate::scale::{axis_length, fill_viewport, TimeScale};
use crate::shapes::glyph_path;
use chrono::{NaiveDate, NaiveDateTime};
use ganttline_core::calendar::extra_duration_days_off;
use ganttline_core::{
    Color, DayOff, DurationUnit, GroupedTask, Milestone, MilestoneShape, RelationshipPosition,
    ResourceLabelPosition, Settings, Task, TaskCoordinates, TaskId,
};
use ganttline_ingest::MilestoneRegistry;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Gap above the first bar
pub const PADDING_TASKS: f64 = 5.0;
/// Row height divided by this gives the bar height
pub const CHART_LINE_PROPORTION: f64 = 1.5;
/// Corner radius of rounded bars
pub const RECT_ROUND: f64 = 7.0;
/// Extra offset under a top-placed resource label
pub const LABEL_TOP_OFFSET: f64 = 0.5;

// ============================================================================
// Output
// ============================================================================

/// Where the completed part of a bar ends, as a fraction of its width
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressStop {
    pub task: TaskId,
    pub row: usize,
    pub stop: f64,
}

/// One glyph, standing for every milestone of a task on one calendar day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MilestoneGlyph {
    pub task: TaskId,
    pub row: usize,
    /// Kind of the last milestone on that day, which supplies the style
    pub kind: String,
    /// Every kind merged into this glyph, in input order
    pub kinds: Vec<String>,
    pub start: NaiveDateTime,
    pub x: f64,
    pub y: f64,
    pub shape: MilestoneShape,
    pub color: Color,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayOffOverlay {
    pub task: TaskId,
    pub row: usize,
    pub day_off: DayOff,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceLabel {
    pub task: TaskId,
    pub row: usize,
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Name column entry for one rendered row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowLabel {
    pub row: usize,
    pub name: String,
    /// Horizontal indent from the nesting level
    pub indent: f64,
    /// The row's first task has children
    pub collapsible: bool,
    pub collapsed: bool,
}

/// A link between two consecutive bars
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRelationship {
    pub from: TaskId,
    pub to: TaskId,
    pub position: RelationshipPosition,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// All geometry of one recompute
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    /// `None` when there is no task to take dates from
    pub scale: Option<TimeScale>,
    pub axis_length: f64,
    /// Height of the bar area
    pub height: f64,
    /// One entry per rendered bar, in draw order
    pub bars: Vec<TaskCoordinates>,
    pub progress: Vec<ProgressStop>,
    pub milestones: Vec<MilestoneGlyph>,
    pub days_off: Vec<DayOffOverlay>,
    pub resource_labels: Vec<ResourceLabel>,
    pub row_labels: Vec<RowLabel>,
    pub relationships: Vec<TaskRelationship>,
}

// ============================================================================
// Inputs
// ============================================================================

/// Dataset facts the layout needs besides the rows themselves
#[derive(Clone, Copy, Debug)]
pub struct LayoutContext<'a> {
    pub settings: &'a Settings,
    pub milestones: &'a MilestoneRegistry,
    pub collapsed: &'a [String],
    /// Whether the input had a resource column at all
    pub resources_present: bool,
    pub duration_unit: DurationUnit,
}

/// Vertical metrics shared by every row
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowGeometry {
    pub row_height: f64,
    pub bar_height: f64,
    /// Per-row margin reserved for top-placed resource labels
    pub top_margin: f64,
}

impl RowGeometry {
    pub fn new(settings: &Settings, resources_present: bool) -> Self {
        let row_height = settings.task_config.height;
        let resource = &settings.task_resource;
        let labels_on_top = resource.position == ResourceLabelPosition::Top;
        let top_margin = if resources_present && resource.show && labels_on_top {
            resource.font_size + LABEL_TOP_OFFSET
        } else {
            0.0
        };
        Self {
            row_height,
            bar_height: row_height / CHART_LINE_PROPORTION,
            top_margin,
        }
    }

    /// Top edge of the bar on row `index`
    pub fn bar_y(&self, index: usize) -> f64 {
        let index = index as f64;
        self.row_height * index + PADDING_TASKS + (index + 1.0) * self.top_margin
    }

    /// Offset of a resource label from the bar's top edge
    pub fn resource_offset(&self, position: ResourceLabelPosition, font_size: f64) -> f64 {
        match position {
            ResourceLabelPosition::Right => self.bar_height / 2.0 + font_size / 2.0,
            ResourceLabelPosition::Top => -(font_size / 4.0) + LABEL_TOP_OFFSET,
            ResourceLabelPosition::Inside => {
                -(font_size / 4.0) + LABEL_TOP_OFFSET + self.bar_height / CHART_LINE_PROPORTION
            }
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Compute the geometry of `rows`
pub fn compute_layout(rows: &[GroupedTask], ctx: &LayoutContext<'_>) -> ChartLayout {
    let settings = ctx.settings;
    let geometry = RowGeometry::new(settings, ctx.resources_present);
    let viewport = settings.layout.viewport_width;

    let domain = TimeScale::domain(rows.iter().flat_map(|g| g.tasks.iter()));
    let (scale, axis) = match domain {
        Some((start, end)) => {
            let length = axis_length(start, end, settings.date_type.kind, viewport);
            (Some(TimeScale::new(start, end, length)), length)
        }
        None => (None, fill_viewport(0.0, viewport)),
    };

    let mut layout = ChartLayout {
        scale,
        axis_length: axis,
        height: rows.len() as f64 * (geometry.row_height + geometry.top_margin) + PADDING_TASKS,
        ..ChartLayout::default()
    };

    for group in rows {
        let row = group.index;
        layout.row_labels.push(RowLabel {
            row,
            name: group.name.clone(),
            indent: f64::from(group.level.unwrap_or(0)) * settings.task_groups.group_padding,
            collapsible: group.tasks.first().is_some_and(Task::has_children),
            collapsed: ctx.collapsed.contains(&group.name),
        });

        for task in &group.tasks {
            let bar = bar_coordinates(task, row, scale.as_ref(), &geometry, ctx);
            if let Some(completion) = task.completion {
                layout.progress.push(ProgressStop {
                    task: task.id,
                    row,
                    stop: progress_stop(task, completion, ctx),
                });
            }
            if let Some(scale) = &scale {
                let glyphs = milestone_glyphs(task, row, scale, &geometry, ctx.milestones);
                layout.milestones.extend(glyphs);
                if settings.days_off.show {
                    let rounded = settings.general.bars_rounded_corners;
                    layout.days_off.extend(day_off_overlays(task, row, scale, &geometry, rounded));
                }
            }
            if let Some(label) = resource_label(task, row, scale.as_ref(), &geometry, ctx) {
                layout.resource_labels.push(label);
            }
            layout.bars.push(bar);
        }
    }

    if settings.relationships.show {
        layout.relationships = relationships(&layout.bars, settings.relationships.position);
    }

    layout
}

fn bar_coordinates(
    task: &Task,
    row: usize,
    scale: Option<&TimeScale>,
    geometry: &RowGeometry,
    ctx: &LayoutContext<'_>,
) -> TaskCoordinates {
    let shows_bar = ctx.collapsed.contains(&task.name) || task.milestones.is_empty();
    let (x, width) = match scale {
        Some(scale) => {
            let x = scale.scale(task.start);
            let width = if shows_bar { scale.scale(task.end) - x } else { 0.0 };
            (x, width)
        }
        None => (0.0, 0.0),
    };
    TaskCoordinates {
        x,
        y: geometry.bar_y(row),
        width,
        height: geometry.bar_height,
        task: task.id,
    }
}

/// Completion stop, stretched by the days off inside the completed span
fn progress_stop(task: &Task, completion: f64, ctx: &LayoutContext<'_>) -> f64 {
    let days_off = &ctx.settings.days_off;
    if !days_off.show || task.days_off.is_empty() || task.duration <= 0.0 {
        return completion.clamp(0.0, 1.0);
    }

    let span = (task.end - task.start).num_milliseconds() as f64;
    let progressed = chrono::Duration::try_milliseconds((span * completion).round() as i64)
        .and_then(|delta| task.start.checked_add_signed(delta))
        .unwrap_or(task.end);
    let within: Vec<DayOff> = task
        .days_off
        .iter()
        .filter(|block| {
            let at = midnight(block.start);
            task.start <= at && at <= progressed
        })
        .copied()
        .collect();
    let first_day = days_off.first_day_of_week;
    let extra = extra_duration_days_off(&within, task.start, first_day, ctx.duration_unit);
    (completion + extra / task.duration).clamp(0.0, 1.0)
}

/// Glyphs for a task's milestones, one per calendar day in first-seen order
fn milestone_glyphs(
    task: &Task,
    row: usize,
    scale: &TimeScale,
    geometry: &RowGeometry,
    registry: &MilestoneRegistry,
) -> Vec<MilestoneGlyph> {
    let mut days: Vec<(NaiveDate, Vec<&Milestone>)> = Vec::new();
    for milestone in &task.milestones {
        let day = milestone.start.date();
        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, same_day)) => same_day.push(milestone),
            None => days.push((day, vec![milestone])),
        }
    }

    days.into_iter()
        .filter_map(|(_, same_day)| {
            let last = *same_day.last()?;
            let (shape, color) = match registry.get(&last.kind) {
                Some(point) => (point.shape, point.color),
                None => (MilestoneShape::default(), task.default_color),
            };
            Some(MilestoneGlyph {
                task: task.id,
                row,
                kind: last.kind.clone(),
                kinds: same_day.iter().map(|m| m.kind.clone()).collect(),
                start: last.start,
                x: scale.scale(last.start) - geometry.bar_height / 4.0,
                y: geometry.bar_y(row),
                shape,
                color,
                path: glyph_path(shape, geometry.bar_height),
            })
        })
        .collect()
}

/// Overlays for a leaf task's days off that begin before its last day
fn day_off_overlays(
    task: &Task,
    row: usize,
    scale: &TimeScale,
    geometry: &RowGeometry,
    rounded: bool,
) -> Vec<DayOffOverlay> {
    if task.has_children() {
        return Vec::new();
    }
    let last_day = task.end.date();
    let radius = if rounded { RECT_ROUND } else { 0.0 };
    task.days_off
        .iter()
        .filter(|block| block.start < last_day)
        .map(|block| {
            let mut x = scale.scale(midnight(block.start));
            let width = scale.scale(midnight(block.end())) - x;
            if width < radius {
                x -= width / 2.0;
            }
            DayOffOverlay {
                task: task.id,
                row,
                day_off: *block,
                x,
                y: geometry.bar_y(row),
                width,
                height: geometry.bar_height,
            }
        })
        .collect()
}

fn resource_label(
    task: &Task,
    row: usize,
    scale: Option<&TimeScale>,
    geometry: &RowGeometry,
    ctx: &LayoutContext<'_>,
) -> Option<ResourceLabel> {
    let resource = &ctx.settings.task_resource;
    if !ctx.resources_present
        || !resource.show
        || task.resource.is_empty()
        || !task.milestones.is_empty()
    {
        return None;
    }
    let x = scale.map_or(0.0, |scale| match resource.position {
        ResourceLabelPosition::Right => {
            scale.scale(task.end) + resource.font_size / 2.0 + RECT_ROUND
        }
        ResourceLabelPosition::Top => scale.scale(task.start) + RECT_ROUND,
        ResourceLabelPosition::Inside => {
            scale.scale(task.start) + geometry.bar_height / 3.0 + RECT_ROUND
        }
    });
    Some(ResourceLabel {
        task: task.id,
        row,
        text: task.resource.clone(),
        x,
        y: geometry.bar_y(row) + geometry.resource_offset(resource.position, resource.font_size),
    })
}

/// Link every bar to the next one in draw order
fn relationships(
    bars: &[TaskCoordinates],
    position: RelationshipPosition,
) -> Vec<TaskRelationship> {
    let start = |bar: &TaskCoordinates| bar.x;
    let finish = |bar: &TaskCoordinates| bar.x + bar.width;
    bars.windows(2)
        .map(|pair| {
            let (from, to) = (&pair[0], &pair[1]);
            let (x1, x2) = match position {
                RelationshipPosition::StartToFinish => (start(from), finish(to)),
                RelationshipPosition::FinishToStart => (finish(from), start(to)),
                RelationshipPosition::StartToStart => (start(from), start(to)),
                RelationshipPosition::FinishToFinish => (finish(from), finish(to)),
            };
            TaskRelationship {
                from: from.task,
                to: to.task,
                position,
                x1,
                y1: from.y + from.height / 2.0,
                x2,
                y2: to.y + to.height / 2.0,
            }
        })
        .collect()
}
