//! Plain-text rendering of a model, one line per rendered row.

use ganttline_core::GroupedTask;
use ganttline_layout::GanttModel;
use std::fmt::Write;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render the rows of `model` as an aligned table
pub fn render_text(model: &GanttModel) -> String {
    let mut out = String::new();
    if model.grouped.is_empty() {
        out.push_str("No tasks\n");
        return out;
    }

    let name_width = model
        .grouped
        .iter()
        .map(|g| label(g, model).chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let _ = writeln!(
        out,
        "{:<4} {:<name_width$} {:<16} {:<16} {:>10} {:>6}  {}",
        "Row", "Task", "Start", "End", "Duration", "Done", "Resource"
    );
    for group in &model.grouped {
        let Some(task) = group.tasks.first() else {
            continue;
        };
        let start = group.tasks.iter().map(|t| t.start).min().unwrap_or(task.start);
        let end = group.tasks.iter().map(|t| t.end).max().unwrap_or(task.end);
        let done = task
            .completion
            .map_or_else(|| "-".to_string(), |c| format!("{:.0}%", c * 100.0));
        let _ = writeln!(
            out,
            "{:<4} {:<name_width$} {:<16} {:<16} {:>10} {:>6}  {}",
            group.index,
            label(group, model),
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT),
            format!("{} {}", trim_number(task.duration), model.duration_unit),
            done,
            task.resource,
        );
    }

    let _ = writeln!(out, "\n{} rows, unit: {}", model.grouped.len(), model.duration_unit);
    if !model.collapsed.is_empty() {
        let _ = writeln!(out, "Collapsed: {}", model.collapsed.join(", "));
    }
    let legend = &model.legend;
    if !legend.is_empty() {
        let entries: Vec<_> = legend
            .entries
            .iter()
            .map(|e| format!("{} {}", e.label, e.color))
            .collect();
        let title = legend.title.as_deref().unwrap_or("Legend");
        let _ = writeln!(out, "{title}: {}", entries.join(", "));
    }
    out
}

/// Name with indentation by level and a marker for collapsible rows
fn label(group: &GroupedTask, model: &GanttModel) -> String {
    let depth = group.level.map_or(0, |l| l.saturating_sub(1)) as usize;
    let marker = match model.layout.row_labels.get(group.index) {
        Some(row) if row.collapsed => "+ ",
        Some(row) if row.collapsible => "- ",
        _ => "",
    };
    format!("{}{marker}{}", "  ".repeat(depth), group.name)
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
