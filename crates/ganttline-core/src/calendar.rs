//! Duration and calendar arithmetic.
//!
//! Pure functions over dates: end-date stepping in a duration unit, the
//! weekend walk that produces [`DayOff`] blocks, and the extension of a
//! duration-driven task across the days off it spans.
//!
//! The weekend is the two days before the configured first day of the week:
//! `(first_day_of_week + 5) % 7` and `(first_day_of_week + 6) % 7`, with
//! weekdays numbered from Sunday = 0.

use crate::{DayOff, DurationUnit};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Length of a weekend block
pub const DAYS_IN_A_WEEKEND: u32 = 2;

/// Upper bound on re-extension passes for a duration-driven task
const MAX_DAYS_OFF_PASSES: usize = 64;

/// Offset `start` by `step` units.
///
/// Fractional steps are honoured down to the millisecond. An offset that
/// does not fit the calendar leaves `start` unchanged.
pub fn end_date(unit: DurationUnit, start: NaiveDateTime, step: f64) -> NaiveDateTime {
    let millis = (step * unit.millis() as f64).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return start;
    }
    TimeDelta::try_milliseconds(millis as i64)
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(start)
}

/// Midnight at the start of the day containing `at`
pub fn start_of_day(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_time(NaiveTime::MIN)
}

/// Whether `at` is exactly midnight
pub fn is_midnight(at: NaiveDateTime) -> bool {
    at.time() == NaiveTime::MIN
}

fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Size of the off-block that starts on `date`, if `date` is a day off.
///
/// The first weekend day opens a two-day block; the second only itself.
fn off_block_len(date: NaiveDate, first_day_of_week: u32) -> Option<u32> {
    let fdw = first_day_of_week % 7;
    let weekday = weekday_number(date);
    if weekday == (fdw + 5) % 7 {
        Some(DAYS_IN_A_WEEKEND)
    } else if weekday == (fdw + 6) % 7 {
        Some(1)
    } else {
        None
    }
}

pub fn is_day_off(date: NaiveDate, first_day_of_week: u32) -> bool {
    off_block_len(date, first_day_of_week).is_some()
}

/// Record a block unless the previous one already covers its first day.
///
/// Blocks arrive in increasing date order, so only the last can overlap.
fn push_block(days_off: &mut Vec<DayOff>, date: NaiveDate, days: u32) -> bool {
    if days_off.last().is_some_and(|block| block.covers(date)) {
        return false;
    }
    days_off.push(DayOff::new(date, days));
    true
}

/// Collect the weekend blocks touched by the span `[from, to)`.
///
/// The walk moves one day at a time through working days and jumps over a
/// whole block once it lands on one. When `to` is not midnight, a block
/// containing the partial last day is included too. The result is strictly
/// increasing by date and its blocks never overlap.
pub fn calculate_days_off(
    first_day_of_week: u32,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Vec<DayOff> {
    let mut days_off = Vec::new();
    if from.date() == to.date() && !is_day_off(from.date(), first_day_of_week) {
        return days_off;
    }

    let mut cursor = from;
    while cursor < to {
        let advance = match off_block_len(cursor.date(), first_day_of_week) {
            Some(days) if push_block(&mut days_off, cursor.date(), days) => days,
            _ => 1,
        };
        match cursor.checked_add_signed(TimeDelta::days(i64::from(advance))) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    if !is_midnight(to) {
        if let Some(days) = off_block_len(to.date(), first_day_of_week) {
            push_block(&mut days_off, to.date(), days);
        }
    }

    days_off
}

/// Extra duration, in `unit`, that a task must absorb to skip `days_off`.
///
/// When the task starts inside a day off, the part of that day already
/// behind `start` is not added again.
pub fn extra_duration_days_off(
    days_off: &[DayOff],
    start: NaiveDateTime,
    first_day_of_week: u32,
    unit: DurationUnit,
) -> f64 {
    let mut days = 0u32;
    let mut i = 0;
    while i < days_off.len() {
        let block = days_off[i];
        days += block.days;
        let overlaps_next = block.days == DAYS_IN_A_WEEKEND
            && days_off
                .get(i + 1)
                .is_some_and(|next| Some(next.start) == block.start.succ_opt());
        i += if overlaps_next { 2 } else { 1 };
    }

    let mut extra = unit.from_days(f64::from(days));
    if is_day_off(start.date(), first_day_of_week) {
        let elapsed = (start - start_of_day(start)).num_milliseconds();
        extra -= unit.from_millis(elapsed);
    }
    extra.max(0.0)
}

/// Days off of a task and its end date once they are accounted for
#[derive(Clone, Debug, PartialEq)]
pub struct DaysOffSchedule {
    pub end: NaiveDateTime,
    pub days_off: Vec<DayOff>,
}

/// Compute the days off of a task.
///
/// With `extend` set (the duration drives the end date) the end is pushed
/// out by the days off it spans, the blocks are recomputed against the new
/// end, and this repeats until the set of blocks stops changing.
pub fn settle_days_off(
    start: NaiveDateTime,
    end: NaiveDateTime,
    duration: f64,
    unit: DurationUnit,
    first_day_of_week: u32,
    extend: bool,
) -> DaysOffSchedule {
    let mut end = end;
    let mut days_off = calculate_days_off(first_day_of_week, start, end);
    if !extend {
        return DaysOffSchedule { end, days_off };
    }

    for _ in 0..MAX_DAYS_OFF_PASSES {
        if days_off.is_empty() {
            break;
        }
        let extra = extra_duration_days_off(&days_off, start, first_day_of_week, unit);
        end = end_date(unit, start, duration + extra);
        let next = calculate_days_off(first_day_of_week, start, end);
        if next == days_off {
            break;
        }
        days_off = next;
    }

    DaysOffSchedule { end, days_off }
}
