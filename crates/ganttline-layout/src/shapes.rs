//! Milestone glyph outlines as SVG path data.
//!
//! Paths are drawn in glyph-local coordinates; the layout positions
//! them with the glyph's `x`/`y`.

use ganttline_core::MilestoneShape;

/// Outline of a milestone glyph sized for a bar of `bar_height`
pub fn glyph_path(shape: MilestoneShape, bar_height: f64) -> String {
    match shape {
        MilestoneShape::Rhombus => diamond(bar_height),
        MilestoneShape::Square => square(bar_height),
        MilestoneShape::Circle => circle(bar_height),
    }
}

fn diamond(h: f64) -> String {
    format!("M {} 0 {} {} {} {} 0 {} Z", h / 4.0, h / 2.0, h / 2.0, h / 4.0, h, h / 2.0)
}

fn square(h: f64) -> String {
    const LEFT: f64 = -2.0;
    format!("M {LEFT} 5 H {} V {} H {LEFT} Z", h / 1.8, h / 1.5)
}

fn circle(h: f64) -> String {
    let (r, cx, cy) = (h / 3.0, h / 4.0, h / 2.0);
    format!(
        "M {cx} {cy} m -{r}, 0 a {r}, {r} 0 1,0 {},0 a {r},{r} 0 1,0 -{},0",
        r * 2.0,
        r * 2.0
    )
}
