//! Milestone kinds and their canonical style.

use ganttline_core::{Color, MilestoneShape};
use serde::{Deserialize, Serialize};

/// Style a row requests for its milestone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneStyle {
    pub shape: Option<MilestoneShape>,
    pub color: Option<Color>,
}

/// Canonical style of one milestone kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDataPoint {
    pub name: String,
    pub shape: MilestoneShape,
    pub color: Color,
}

/// Milestone kinds in first-seen order.
///
/// A kind seen on several rows keeps a single style; the last row that
/// specifies a shape or color wins for that attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRegistry {
    points: Vec<MilestoneDataPoint>,
}

impl MilestoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an occurrence of `name`, with the row's style if it has one
    pub fn observe(&mut self, name: &str, style: Option<&MilestoneStyle>, default_color: Color) {
        let index = match self.points.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.points.push(MilestoneDataPoint {
                    name: name.to_string(),
                    shape: MilestoneShape::default(),
                    color: default_color,
                });
                self.points.len() - 1
            }
        };
        if let Some(style) = style {
            let point = &mut self.points[index];
            if let Some(shape) = style.shape {
                point.shape = shape;
            }
            if let Some(color) = style.color {
                point.color = color;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&MilestoneDataPoint> {
        self.points.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MilestoneDataPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
