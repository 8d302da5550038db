//! CSV row files and the other inputs of the CLI.
//!
//! Headers are matched case-insensitively with spaces, dashes and
//! underscores ignored, so `Start Date`, `start_date` and `startdate` all
//! read as the start column. Unknown headers become extra information.

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use ganttline_core::{Color, MilestoneShape, Settings, SortDirection};
use ganttline_ingest::{Column, DataTable, MilestoneStyle, Role};
use std::path::Path;
use tracing::{debug, warn};

/// Column kinds a CSV header can map to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Header {
    Role(Role),
    MilestoneShape,
    MilestoneColor,
}

/// Pick the separator that occurs most often in the header line
fn detect_delimiter(first_line: &str) -> u8 {
    let count = |c: char| first_line.matches(c).count();
    let (semicolons, tabs, commas) = (count(';'), count('\t'), count(','));
    if semicolons > commas && semicolons >= tabs {
        b';'
    } else if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-', '_'], "")
}

fn header_kind(normalized: &str) -> Header {
    match normalized {
        "task" | "name" | "taskname" => Header::Role(Role::Task),
        "parent" | "parenttask" => Header::Role(Role::Parent),
        "start" | "startdate" => Header::Role(Role::StartDate),
        "end" | "enddate" => Header::Role(Role::EndDate),
        "duration" => Header::Role(Role::Duration),
        "completion" | "progress" => Header::Role(Role::Completion),
        "resource" => Header::Role(Role::Resource),
        "milestone" | "milestones" => Header::Role(Role::Milestones),
        "legend" | "type" => Header::Role(Role::Legend),
        "color" | "taskcolor" => Header::Role(Role::TaskColor),
        "milestoneshape" => Header::MilestoneShape,
        "milestonecolor" => Header::MilestoneColor,
        _ => Header::Role(Role::ExtraInformation),
    }
}

fn parse_shape(raw: &str) -> Option<MilestoneShape> {
    match normalize_header(raw).as_str() {
        "rhombus" | "diamond" => Some(MilestoneShape::Rhombus),
        "circle" => Some(MilestoneShape::Circle),
        "square" => Some(MilestoneShape::Square),
        _ => None,
    }
}

/// Read a CSV row file into a role-tagged table.
///
/// `sort` marks the task column as sorted, which orders siblings by name.
pub fn read_rows(path: &Path, sort: Option<SortDirection>) -> Result<DataTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_rows(&content, sort).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse CSV text into a role-tagged table
pub fn parse_rows(content: &str, sort: Option<SortDirection>) -> Result<DataTable> {
    let first_line = content.lines().next().unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(first_line))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Failed to read CSV headers")?.clone();
    let kinds: Vec<Header> = headers.iter().map(|h| header_kind(&normalize_header(h))).collect();
    if !kinds.contains(&Header::Role(Role::Task)) {
        warn!(headers = ?headers.iter().collect::<Vec<_>>(), "CSV has no task column");
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); kinds.len()];
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                // Header is line 1
                warn!(line = line + 2, %err, "skipping unreadable CSV row");
                continue;
            }
        };
        for (col, values) in cells.iter_mut().enumerate() {
            values.push(record.get(col).unwrap_or_default().to_string());
        }
    }

    let mut table = DataTable::new();
    let mut shapes: Option<&[String]> = None;
    let mut colors: Option<&[String]> = None;
    for ((kind, name), values) in kinds.iter().zip(headers.iter()).zip(&cells) {
        match *kind {
            Header::Role(role) => {
                let mut column = Column::new(role, name).texts(values);
                if role == Role::Task {
                    if let Some(direction) = sort {
                        column = column.sorted(direction);
                    }
                }
                table = table.column(column);
            }
            Header::MilestoneShape => shapes = Some(values.as_slice()),
            Header::MilestoneColor => colors = Some(values.as_slice()),
        }
    }

    let rows = cells.first().map_or(0, Vec::len);
    for row in 0..rows {
        let shape = shapes.and_then(|s| s.get(row)).filter(|s| !s.is_empty()).and_then(|raw| {
            let shape = parse_shape(raw);
            if shape.is_none() {
                warn!(row, shape = %raw, "unknown milestone shape");
            }
            shape
        });
        let color = colors.and_then(|c| c.get(row)).filter(|c| !c.is_empty()).and_then(|raw| {
            raw.parse::<Color>()
                .map_err(|err| warn!(row, %err, "ignoring milestone color"))
                .ok()
        });
        if shape.is_some() || color.is_some() {
            table = table.milestone_style(row, MilestoneStyle { shape, color });
        }
    }

    debug!(rows, columns = kinds.len(), "read CSV rows");
    Ok(table)
}

/// Load settings from a TOML file, or the defaults
pub fn read_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Settings::from_toml_str(&source)
        .with_context(|| format!("Invalid settings in {}", path.display()))
}

/// Parse `asc`/`desc`
pub fn parse_sort(raw: &str) -> Result<SortDirection> {
    match raw.to_lowercase().as_str() {
        "asc" | "ascending" => Ok(SortDirection::Ascending),
        "desc" | "descending" => Ok(SortDirection::Descending),
        other => bail!("Unknown sort direction '{other}', expected asc or desc"),
    }
}

/// Parse the `--now` override
pub fn parse_now(raw: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    if let Some(at) = FORMATS.iter().find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok()) {
        return Ok(at);
    }
    let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD[ HH:MM[:SS]]"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}
