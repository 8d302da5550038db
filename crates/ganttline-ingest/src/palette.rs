//! Category colors and the legend.

use ganttline_core::Color;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Categorical palette, handed out in order of first request
pub const DEFAULT_PALETTE: [Color; 10] = [
    Color::rgb(0x01, 0xB8, 0xAA),
    Color::rgb(0x37, 0x46, 0x49),
    Color::rgb(0xFD, 0x62, 0x5E),
    Color::rgb(0xF2, 0xC8, 0x0F),
    Color::rgb(0x5F, 0x6B, 0x6D),
    Color::rgb(0x8A, 0xD4, 0xEB),
    Color::rgb(0xFE, 0x96, 0x66),
    Color::rgb(0xA6, 0x69, 0x99),
    Color::rgb(0x35, 0x99, 0xB8),
    Color::rgb(0xDF, 0xBF, 0xBF),
];

/// Assigns a stable color per category key
#[derive(Clone, Debug, Default)]
pub struct Palette {
    overrides: BTreeMap<String, Color>,
    assigned: HashMap<String, Color>,
    next: usize,
}

impl Palette {
    pub fn new(overrides: BTreeMap<String, Color>) -> Self {
        Self {
            overrides,
            ..Self::default()
        }
    }

    /// Override for `key` if configured, else its palette slot
    pub fn color_for(&mut self, key: &str) -> Color {
        if let Some(color) = self.overrides.get(key) {
            return *color;
        }
        if let Some(color) = self.assigned.get(key) {
            return *color;
        }
        let color = DEFAULT_PALETTE[self.next % DEFAULT_PALETTE.len()];
        self.next += 1;
        self.assigned.insert(key.to_string(), color);
        color
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub title: Option<String>,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn color_of(&self, label: &str) -> Option<Color> {
        self.entries.iter().find(|e| e.label == label).map(|e| e.color)
    }
}
