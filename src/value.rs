//! # Unit-Carrying Values
//!
//! [`PredictionValue`] is a signed quantity tagged with [`Units`]; it is what
//! the engine returns for tide levels, datums and derivatives.
//! [`Amplitude`] is its non-negative sibling used for constituent magnitudes
//! and derivative bounds.
//!
//! ## Unit discipline
//!
//! - Adding, subtracting and comparing require both operands to share units,
//!   unless one of them is 0 Zulu (exactly zero, no units yet), which adopts
//!   the other operand's units.
//! - Comparisons first harmonize: the zulu operand takes the other's units,
//!   otherwise the right operand is converted to the left operand's units.
//! - Feet and meters convert linearly (1 ft = 0.3048 m).
//! - Knots and knots squared convert by squaring / square-rooting the
//!   magnitude and keeping the sign. That is the tidal convention for
//!   hydraulic currents, not ordinary arithmetic.
//! - Every other conversion is a caller bug and panics.

use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

const METERS_PER_FOOT: f64 = 0.3048;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PredictionValue {
    value: f64,
    units: Units,
}

impl Default for PredictionValue {
    /// 0 Zulu.
    fn default() -> Self {
        PredictionValue::zero()
    }
}

impl PredictionValue {
    /// 0 Zulu.
    pub const fn zero() -> Self {
        PredictionValue {
            value: 0.0,
            units: Units::Zulu,
        }
    }

    pub fn new(units: Units, value: f64) -> Self {
        assert!(
            value == 0.0 || units != Units::Zulu,
            "only zero may carry zulu units (got {value})"
        );
        PredictionValue { value, units }
    }

    pub fn val(self) -> f64 {
        self.value
    }

    pub fn units(self) -> Units {
        self.units
    }

    pub fn is_zulu(self) -> bool {
        self.units == Units::Zulu
    }

    /// Convert in place. Converting to the units already held is harmless
    /// but almost certainly unintended, so it is reported and ignored.
    pub fn set_units(&mut self, units: Units) {
        if self.units == units {
            tracing::warn!(units = %units, "no conversion needed; value already in requested units");
            return;
        }
        self.value = convert(self.value, self.units, units);
        self.units = units;
    }

    /// By-value form of [`set_units`](Self::set_units) that is silent when
    /// no conversion is needed.
    pub fn in_units(mut self, units: Units) -> Self {
        if self.units != units {
            self.set_units(units);
        }
        self
    }

    /// Like `+=` but converts the addend to this value's units first.
    pub fn convert_and_add(&mut self, addend: PredictionValue) {
        if addend.units == Units::Zulu {
            assert!(addend.value == 0.0);
            return;
        }
        let addend = if self.units != Units::Zulu && self.units != addend.units {
            addend.in_units(self.units)
        } else {
            addend
        };
        *self += addend;
    }

    pub fn abs(self) -> Self {
        PredictionValue {
            value: self.value.abs(),
            units: self.units,
        }
    }
}

fn conversion_panic(from: Units, to: Units) -> ! {
    panic!("impossible unit conversion from {from} to {to}")
}

/// Numeric part of a unit conversion.
fn convert(value: f64, from: Units, to: Units) -> f64 {
    match from {
        Units::Zulu => {
            assert!(value == 0.0, "zulu value must be zero");
            value
        }
        Units::Feet if to == Units::Meters => value * METERS_PER_FOOT,
        Units::Meters if to == Units::Feet => value / METERS_PER_FOOT,
        Units::KnotsSquared if to == Units::Knots => {
            if value < 0.0 {
                -(value.abs().sqrt())
            } else {
                value.sqrt()
            }
        }
        Units::Knots if to == Units::KnotsSquared => {
            if value < 0.0 {
                -(value * value)
            } else {
                value * value
            }
        }
        _ => conversion_panic(from, to),
    }
}

/// Bring two values to common units before comparing.
fn harmonize(mut a: PredictionValue, mut b: PredictionValue) -> (PredictionValue, PredictionValue) {
    if a.units != b.units {
        if a.units == Units::Zulu {
            a.set_units(b.units);
        } else {
            b.set_units(a.units);
        }
    }
    (a, b)
}

impl AddAssign for PredictionValue {
    fn add_assign(&mut self, addend: PredictionValue) {
        if addend.units == Units::Zulu {
            assert!(addend.value == 0.0, "zulu value must be zero");
        } else if self.units == Units::Zulu {
            assert!(self.value == 0.0, "zulu value must be zero");
            *self = addend;
        } else {
            assert!(
                self.units == addend.units,
                "cannot add {} to {}",
                addend.units,
                self.units
            );
            self.value += addend.value;
        }
    }
}

impl SubAssign for PredictionValue {
    fn sub_assign(&mut self, subtrahend: PredictionValue) {
        *self += -subtrahend;
    }
}

impl Add for PredictionValue {
    type Output = PredictionValue;
    fn add(mut self, rhs: PredictionValue) -> PredictionValue {
        self += rhs;
        self
    }
}

impl Sub for PredictionValue {
    type Output = PredictionValue;
    fn sub(mut self, rhs: PredictionValue) -> PredictionValue {
        self -= rhs;
        self
    }
}

impl Neg for PredictionValue {
    type Output = PredictionValue;
    fn neg(self) -> PredictionValue {
        PredictionValue {
            value: -self.value,
            units: self.units,
        }
    }
}

impl MulAssign<f64> for PredictionValue {
    fn mul_assign(&mut self, multiplier: f64) {
        self.value *= multiplier;
    }
}

impl DivAssign<f64> for PredictionValue {
    fn div_assign(&mut self, divisor: f64) {
        self.value /= divisor;
    }
}

impl Mul<f64> for PredictionValue {
    type Output = PredictionValue;
    fn mul(mut self, rhs: f64) -> PredictionValue {
        self *= rhs;
        self
    }
}

impl Mul<PredictionValue> for f64 {
    type Output = PredictionValue;
    fn mul(self, mut rhs: PredictionValue) -> PredictionValue {
        rhs *= self;
        rhs
    }
}

impl Div<f64> for PredictionValue {
    type Output = PredictionValue;
    fn div(mut self, rhs: f64) -> PredictionValue {
        self /= rhs;
        self
    }
}

/// Dimensionless ratio of two same-unit values.
impl Div for PredictionValue {
    type Output = f64;
    fn div(self, rhs: PredictionValue) -> f64 {
        assert!(
            self.units == rhs.units,
            "cannot divide {} by {}",
            self.units,
            rhs.units
        );
        self.value / rhs.value
    }
}

impl PartialEq for PredictionValue {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = harmonize(*self, *other);
        a.value == b.value
    }
}

impl PartialOrd for PredictionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let (a, b) = harmonize(*self, *other);
        a.value.partial_cmp(&b.value)
    }
}

/// Fixed point, two decimals unless the formatter asks for a precision,
/// followed by the short unit name.
impl fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        if self.is_zulu() {
            write!(f, "{:.*}", precision, self.value)
        } else {
            write!(f, "{:.*} {}", precision, self.value, self.units.short_name())
        }
    }
}

impl From<Amplitude> for PredictionValue {
    fn from(a: Amplitude) -> Self {
        a.pv
    }
}

/// Non-negative magnitude with units. Not a `PredictionValue`: negating it
/// is not allowed, but it converts to one freely.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Amplitude {
    pv: PredictionValue,
}

impl Amplitude {
    /// 0 Zulu.
    pub const fn zero() -> Self {
        Amplitude {
            pv: PredictionValue::zero(),
        }
    }

    pub fn new(units: Units, value: f64) -> Self {
        assert!(value >= 0.0, "amplitude must be non-negative (got {value})");
        Amplitude {
            pv: PredictionValue::new(units, value),
        }
    }

    pub fn val(self) -> f64 {
        self.pv.val()
    }

    pub fn units(self) -> Units {
        self.pv.units()
    }

    pub fn set_units(&mut self, units: Units) {
        self.pv.set_units(units);
    }

    pub fn in_units(self, units: Units) -> Self {
        Amplitude {
            pv: self.pv.in_units(units),
        }
    }
}

impl AddAssign for Amplitude {
    fn add_assign(&mut self, rhs: Amplitude) {
        self.pv += rhs.pv;
    }
}

impl MulAssign<f64> for Amplitude {
    fn mul_assign(&mut self, level_multiply: f64) {
        assert!(level_multiply >= 0.0, "amplitude scale must be non-negative");
        self.pv *= level_multiply;
    }
}

impl Mul<f64> for Amplitude {
    type Output = Amplitude;
    fn mul(mut self, rhs: f64) -> Amplitude {
        self *= rhs;
        self
    }
}

impl PartialEq for Amplitude {
    fn eq(&self, other: &Self) -> bool {
        self.pv == other.pv
    }
}

impl PartialOrd for Amplitude {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.pv.partial_cmp(&other.pv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn feet_meters_are_linear() {
        let mut v = PredictionValue::new(Units::Feet, 10.0);
        v.set_units(Units::Meters);
        assert_relative_eq!(v.val(), 3.048, epsilon = 1e-12);
        v.set_units(Units::Feet);
        assert_relative_eq!(v.val(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn knots_squared_keeps_sign() {
        let sq = PredictionValue::new(Units::Knots, -2.0).in_units(Units::KnotsSquared);
        assert_eq!(sq.units(), Units::KnotsSquared);
        assert_relative_eq!(sq.val(), -4.0);
        let back = sq.in_units(Units::Knots);
        assert_relative_eq!(back.val(), -2.0);
    }

    proptest! {
        #[test]
        fn knots_round_trip_through_knots_squared(v in -50.0f64..50.0) {
            prop_assume!(v != 0.0);
            let back = PredictionValue::new(Units::Knots, v)
                .in_units(Units::KnotsSquared)
                .in_units(Units::Knots);
            prop_assert!((back.val() - v).abs() <= 1e-12 * v.abs().max(1.0));
            prop_assert_eq!(back.val().signum(), v.signum());
        }
    }

    #[test]
    #[should_panic(expected = "impossible unit conversion")]
    fn feet_to_knots_is_a_bug() {
        PredictionValue::new(Units::Feet, 1.0).set_units(Units::Knots);
    }

    #[test]
    fn zulu_adopts_units_of_addend() {
        let mut total = PredictionValue::zero();
        total += PredictionValue::new(Units::Meters, 1.5);
        assert_eq!(total.units(), Units::Meters);
        total += PredictionValue::zero();
        assert_relative_eq!(total.val(), 1.5);
    }

    #[test]
    #[should_panic(expected = "cannot add")]
    fn mixed_units_without_zulu_is_a_bug() {
        let mut total = PredictionValue::new(Units::Meters, 1.0);
        total += PredictionValue::new(Units::Feet, 1.0);
    }

    #[test]
    fn convert_and_add_converts_first() {
        let mut total = PredictionValue::new(Units::Meters, 1.0);
        total.convert_and_add(PredictionValue::new(Units::Feet, 10.0));
        assert_relative_eq!(total.val(), 4.048, epsilon = 1e-12);
        total.convert_and_add(PredictionValue::zero());
        assert_relative_eq!(total.val(), 4.048, epsilon = 1e-12);
    }

    #[test]
    fn harmonized_comparisons_match_same_unit_comparisons() {
        let zulu = PredictionValue::zero();
        for x in [-2.5, 0.0, 3.25] {
            let b = PredictionValue::new(Units::Meters, x);
            let a_m = PredictionValue::new(Units::Meters, 0.0);
            assert_eq!(zulu < b, a_m < b);
            assert_eq!(zulu > b, a_m > b);
            assert_eq!(zulu == b, a_m == b);
            assert_eq!(b < zulu, b < a_m);
        }
    }

    #[test]
    fn cross_unit_comparison_converts_right_operand() {
        let m = PredictionValue::new(Units::Meters, 1.0);
        let ft = PredictionValue::new(Units::Feet, 3.0);
        assert!(m > ft);
        assert!(ft < m);
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn negative_amplitude_is_rejected() {
        let _ = Amplitude::new(Units::Meters, -1.0);
    }

    #[test]
    fn amplitude_accumulates_like_prediction_value() {
        let mut a = Amplitude::zero();
        a += Amplitude::new(Units::Feet, 2.0);
        a += Amplitude::new(Units::Feet, 0.5) * 2.0;
        assert_eq!(a.units(), Units::Feet);
        assert_relative_eq!(a.val(), 3.0);
        assert!(a > Amplitude::new(Units::Feet, 2.9));
    }
}
