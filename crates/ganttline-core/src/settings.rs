//! Engine configuration.
//!
//! Every option has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [general]
//! duration_unit = "hour"
//! duration_min = 2
//!
//! [days_off]
//! show = true
//! first_day_of_week = 1
//!
//! [task_groups]
//! group_tasks = true
//! sub_task_shade = 3
//! ```

use crate::{Color, DateType, DurationUnit, GanttError, RelationshipPosition, ResourceLabelPosition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Largest accepted configured completion maximum
pub const COMPLETION_MAX_IN_PERCENT: f64 = 100.0;

/// Largest accepted sub-task shade step
pub const MAX_SUB_TASK_SHADE: u32 = 5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub days_off: DaysOffSettings,
    pub task_completion: TaskCompletionSettings,
    pub task_config: TaskConfigSettings,
    pub task_resource: TaskResourceSettings,
    pub task_groups: TaskGroupsSettings,
    pub date_type: DateTypeSettings,
    pub relationships: RelationshipSettings,
    pub legend: LegendSettings,
    pub layout: LayoutSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Unit the duration column is expressed in
    pub duration_unit: DurationUnit,
    /// Lower bound for every row's duration
    pub duration_min: f64,
    pub bars_rounded_corners: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            duration_unit: DurationUnit::Day,
            duration_min: 1.0,
            bars_rounded_corners: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaysOffSettings {
    pub show: bool,
    /// 0 = Sunday .. 6 = Saturday
    pub first_day_of_week: u32,
    pub fill: Color,
}

impl Default for DaysOffSettings {
    fn default() -> Self {
        Self {
            show: false,
            first_day_of_week: 0,
            fill: Color::rgb(0x00, 0xB0, 0x93),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCompletionSettings {
    pub show: bool,
    /// Value that stands for 100% completion
    pub max_completion: Option<f64>,
}

impl Default for TaskCompletionSettings {
    fn default() -> Self {
        Self {
            show: true,
            max_completion: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfigSettings {
    /// Default task color
    pub fill: Color,
    /// Row height in pixels
    pub height: f64,
}

impl Default for TaskConfigSettings {
    fn default() -> Self {
        Self {
            fill: Color::default(),
            height: 40.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResourceSettings {
    pub show: bool,
    pub position: ResourceLabelPosition,
    pub font_size: f64,
}

impl Default for TaskResourceSettings {
    fn default() -> Self {
        Self {
            show: true,
            position: ResourceLabelPosition::Right,
            font_size: 9.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskGroupsSettings {
    /// Merge rows that share a name
    pub group_tasks: bool,
    /// Shade step applied per nesting level, 0..=5
    pub sub_task_shade: u32,
    pub group_padding: f64,
}

impl Default for TaskGroupsSettings {
    fn default() -> Self {
        Self {
            group_tasks: false,
            sub_task_shade: 0,
            group_padding: 10.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateTypeSettings {
    pub kind: DateType,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipSettings {
    pub show: bool,
    pub position: RelationshipPosition,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendSettings {
    /// Override color per legend category
    pub colors: BTreeMap<String, Color>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Width of the chart area in pixels
    pub viewport_width: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self { viewport_width: 1000.0 }
    }
}

impl Settings {
    /// Parse a TOML document and normalize it
    pub fn from_toml_str(source: &str) -> Result<Self, GanttError> {
        let settings: Settings = toml::from_str(source)?;
        Ok(settings.normalized())
    }

    /// Bring every option into its accepted range
    pub fn normalized(mut self) -> Self {
        let general = &mut self.general;
        if !general.duration_min.is_finite() || general.duration_min < 1.0 {
            general.duration_min = 1.0;
        }
        self.days_off.first_day_of_week %= 7;
        if self.task_groups.sub_task_shade > MAX_SUB_TASK_SHADE {
            let shade = self.task_groups.sub_task_shade;
            warn!(shade, "sub-task shade clamped to {MAX_SUB_TASK_SHADE}");
            self.task_groups.sub_task_shade = MAX_SUB_TASK_SHADE;
        }
        if !self.task_groups.group_padding.is_finite() || self.task_groups.group_padding < 0.0 {
            self.task_groups.group_padding = 0.0;
        }
        if let Some(max) = self.task_completion.max_completion {
            if !(0.0..=COMPLETION_MAX_IN_PERCENT).contains(&max) {
                warn!(max, "ignoring completion maximum outside 0..=100");
                self.task_completion.max_completion = None;
            }
        }
        if !self.task_config.height.is_finite() || self.task_config.height <= 0.0 {
            self.task_config.height = TaskConfigSettings::default().height;
        }
        self
    }

    /// Set the configured duration unit
    pub fn duration_unit(mut self, unit: DurationUnit) -> Self {
        self.general.duration_unit = unit;
        self
    }

    /// Show days off with the given first day of the week
    pub fn show_days_off(mut self, first_day_of_week: u32) -> Self {
        self.days_off.show = true;
        self.days_off.first_day_of_week = first_day_of_week;
        self
    }

    /// Merge rows sharing a name, shading nested levels
    pub fn group_tasks(mut self, sub_task_shade: u32) -> Self {
        self.task_groups.group_tasks = true;
        self.task_groups.sub_task_shade = sub_task_shade;
        self
    }
}
