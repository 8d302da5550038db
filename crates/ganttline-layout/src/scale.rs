//! Date-to-pixel mapping shared by every layout computation.

use chrono::{Duration, NaiveDateTime};
use ganttline_core::{DateType, Task};
use serde::{Deserialize, Serialize};

/// Pixels per axis tick
pub const DEFAULT_TICKS_LENGTH: f64 = 50.0;
/// The axis never has fewer ticks than this
pub const MIN_TICKS: f64 = 2.0;
/// Share of the viewport the axis fills at minimum
pub const GRAPHIC_WIDTH_PERCENTAGE: f64 = 0.78;

/// Linear map from `[start, end]` onto `[0, range]`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub range: f64,
}

impl TimeScale {
    /// A degenerate domain is widened by one day so the map stays invertible
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, range: f64) -> Self {
        let (start, end) = widen(start, end);
        Self { start, end, range }
    }

    /// Domain `[min start, max end]` over `tasks`, `None` when there are none
    pub fn domain<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
    ) -> Option<(NaiveDateTime, NaiveDateTime)> {
        tasks.into_iter().fold(None, |acc, task| match acc {
            None => Some((task.start, task.end)),
            Some((start, end)) => Some((start.min(task.start), end.max(task.end))),
        })
    }

    fn span_millis(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64
    }

    pub fn scale(&self, at: NaiveDateTime) -> f64 {
        (at - self.start).num_milliseconds() as f64 / self.span_millis() * self.range
    }

    pub fn invert(&self, x: f64) -> NaiveDateTime {
        let offset = (x / self.range * self.span_millis()).round() as i64;
        Duration::try_milliseconds(offset)
            .and_then(|delta| self.start.checked_add_signed(delta))
            .unwrap_or(if offset < 0 { NaiveDateTime::MIN } else { NaiveDateTime::MAX })
    }
}

/// Give an empty or inverted domain one day of width.
///
/// The day is added after `start`, or before it when `start` sits at the
/// end of the calendar.
fn widen(start: NaiveDateTime, end: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    if end > start {
        return (start, end);
    }
    let day = Duration::days(1);
    match start.checked_add_signed(day) {
        Some(end) => (start, end),
        None => (start.checked_sub_signed(day).unwrap_or(start), start),
    }
}

/// Axis length in pixels: one tick per `date_type`, at least
/// [`MIN_TICKS`], widened to fill the viewport share.
pub fn axis_length(
    start: NaiveDateTime,
    end: NaiveDateTime,
    date_type: DateType,
    viewport_width: f64,
) -> f64 {
    let (start, end) = widen(start, end);
    let span = (end - start).num_milliseconds() as f64;
    let ticks = (span / date_type.millis()).ceil().max(MIN_TICKS);
    fill_viewport(ticks * DEFAULT_TICKS_LENGTH, viewport_width)
}

/// Widen `length` to the minimum share of the viewport
pub fn fill_viewport(length: f64, viewport_width: f64) -> f64 {
    length.max(GRAPHIC_WIDTH_PERCENTAGE * viewport_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn maps_domain_onto_range() {
        let scale = TimeScale::new(at(1, 0), at(11, 0), 1000.0);
        assert_eq!(scale.scale(at(1, 0)), 0.0);
        assert_eq!(scale.scale(at(6, 0)), 500.0);
        assert_eq!(scale.scale(at(11, 0)), 1000.0);
        assert_eq!(scale.invert(250.0), at(3, 12));
    }

    #[test]
    fn degenerate_domain_is_widened() {
        let scale = TimeScale::new(at(5, 8), at(5, 8), 100.0);
        assert_eq!(scale.end, at(6, 8));
        assert_eq!(scale.invert(scale.scale(at(5, 20))), at(5, 20));
    }

    #[test]
    fn degenerate_domain_at_calendar_end_widens_backwards() {
        let last = NaiveDateTime::MAX - Duration::hours(1);
        let scale = TimeScale::new(last, last, 100.0);
        assert_eq!(scale.start, last - Duration::days(1));
        assert_eq!(scale.end, last);
        assert_eq!(scale.scale(last), 100.0);
        assert_eq!(scale.invert(1e12), NaiveDateTime::MAX);

        assert_eq!(axis_length(last, last, DateType::Day, 0.0), 100.0);
    }

    #[test]
    fn domain_spans_all_tasks() {
        let tasks = [Task::new(0, "a", at(3, 0), at(4, 0)), Task::new(1, "b", at(1, 0), at(2, 0))];
        assert_eq!(TimeScale::domain(&tasks), Some((at(1, 0), at(4, 0))));
        assert_eq!(TimeScale::domain(&[]), None);
    }

    #[test]
    fn axis_length_counts_ticks() {
        // 40 days of 4-day "weeks": 10 ticks
        let start = at(1, 0);
        let end = start + Duration::days(40);
        assert_eq!(axis_length(start, end, DateType::Week, 0.0), 500.0);
        // Tiny spans still get two ticks
        assert_eq!(axis_length(start, at(1, 1), DateType::Month, 0.0), 100.0);
        // Short axes fill the viewport share
        assert_eq!(axis_length(start, end, DateType::Week, 1000.0), 780.0);
    }
}
