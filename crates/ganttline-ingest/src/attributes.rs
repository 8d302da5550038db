//! Per-row attribute resolution: completion and color.

use crate::palette::Palette;
use ganttline_core::settings::COMPLETION_MAX_IN_PERCENT;
use ganttline_core::Color;

/// Maps raw completion values onto `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionScale {
    max: f64,
}

impl CompletionScale {
    /// Use the configured maximum, or infer one from the data: values
    /// above 1 are read as percentages.
    pub fn new(configured: Option<f64>, observed_max: Option<f64>) -> Self {
        let max = configured.unwrap_or_else(|| match observed_max {
            Some(observed) if observed > 1.0 => COMPLETION_MAX_IN_PERCENT,
            _ => 1.0,
        });
        Self { max }
    }

    /// Fraction complete; `None` when there is nothing to draw
    pub fn resolve(&self, raw: Option<f64>) -> Option<f64> {
        let raw = raw?;
        if self.max <= 0.0 {
            return None;
        }
        let fraction = (raw / self.max).clamp(0.0, 1.0);
        (fraction > 0.0).then_some(fraction)
    }
}

/// How task colors are picked for this dataset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// Every task uses the configured fill
    Single,
    /// Tasks with a legend category use its palette color
    ByCategory,
}

/// Resolve a task color.
///
/// Precedence: row override, then category color, then the default fill.
pub fn resolve_color(
    mode: ColorMode,
    row_override: Option<Color>,
    category: Option<&str>,
    palette: &mut Palette,
    default_fill: Color,
) -> Color {
    if let Some(color) = row_override {
        return color;
    }
    match (mode, category) {
        (ColorMode::ByCategory, Some(category)) => palette.color_for(category),
        _ => default_fill,
    }
}
