//! Simple offsets for subordinate stations whose corrections reduce to a
//! time shift and a level adjustment of the reference harmonics.

use crate::time::Interval;
use crate::value::PredictionValue;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleOffsets {
    time_add: Interval,
    level_add: PredictionValue,
    level_multiply: f64,
}

impl Default for SimpleOffsets {
    /// No shift, 0 Zulu added, unit scale.
    fn default() -> Self {
        SimpleOffsets {
            time_add: Interval::ZERO,
            level_add: PredictionValue::zero(),
            level_multiply: 1.0,
        }
    }
}

impl SimpleOffsets {
    /// A `level_multiply` of zero means "not given" and becomes 1.0.
    pub fn new(time_add: Interval, level_add: PredictionValue, level_multiply: f64) -> Self {
        assert!(level_multiply >= 0.0, "level multiplier must be non-negative");
        SimpleOffsets {
            time_add,
            level_add,
            level_multiply: if level_multiply == 0.0 { 1.0 } else { level_multiply },
        }
    }

    pub fn time_add(&self) -> Interval {
        self.time_add
    }

    pub fn level_add(&self) -> PredictionValue {
        self.level_add
    }

    pub fn level_multiply(&self) -> f64 {
        self.level_multiply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Units;

    #[test]
    fn zero_multiplier_means_unscaled() {
        let o = SimpleOffsets::new(
            Interval::from_minutes(30),
            PredictionValue::new(Units::Feet, 0.5),
            0.0,
        );
        assert_eq!(o.level_multiply(), 1.0);
        assert_eq!(o.time_add(), Interval::from_seconds(1800));
        assert_eq!(SimpleOffsets::default().level_multiply(), 1.0);
    }
}
