//! Dataset-wide duration unit downgrade.
//!
//! A fractional duration (1.5 days) cannot be stepped in whole units, so
//! the unit moves to a finer one (36 hours). All bars share one time scale,
//! which means every task must end up in the same unit: the first pass
//! finds the finest unit any row needs, the second rescales every row.

use ganttline_core::DurationUnit;

const INTEGRAL_TOLERANCE: f64 = 1e-9;

fn is_integral(value: f64) -> bool {
    (value - value.round()).abs() <= INTEGRAL_TOLERANCE * value.abs().max(1.0)
}

/// Outcome of the scan pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitPlan {
    /// Unit the dataset was configured in
    pub configured: DurationUnit,
    /// Number of notches to move towards seconds
    pub steps: u32,
}

impl UnitPlan {
    pub fn unchanged(configured: DurationUnit) -> Self {
        Self { configured, steps: 0 }
    }

    /// Unit every task ends up in
    pub fn unit(&self) -> DurationUnit {
        self.configured.downgraded(self.steps)
    }

    pub fn is_downgraded(&self) -> bool {
        self.steps > 0
    }

    /// Rescale a duration from the configured unit into the final unit
    pub fn transform(&self, duration: f64) -> f64 {
        let scaled = duration * self.configured.conversion_factor(self.steps);
        if is_integral(scaled) {
            scaled.round()
        } else {
            scaled
        }
    }
}

/// Number of notches `duration` needs before it becomes whole.
///
/// Stops at seconds even when the value is still fractional there.
pub fn required_steps(duration: f64, unit: DurationUnit) -> u32 {
    let mut value = duration;
    let mut current = unit;
    let mut steps = 0;
    while !is_integral(value) {
        let Some(finer) = current.finer() else { break };
        value *= current.conversion_factor(1);
        current = finer;
        steps += 1;
    }
    steps
}

/// Scan pass: the deepest downgrade any duration requires
pub fn plan_downgrade(
    durations: impl IntoIterator<Item = f64>,
    configured: DurationUnit,
) -> UnitPlan {
    let steps = durations
        .into_iter()
        .filter(|d| d.is_finite())
        .map(|d| required_steps(d, configured))
        .max()
        .unwrap_or(0);
    UnitPlan { configured, steps }
}
