//! Synthetic harmonics for unit tests.

use crate::constituent::Constituent;
use crate::constituent_set::ConstituentSet;
use crate::offsets::SimpleOffsets;
use crate::station::Station;
use crate::time::{Interval, Speed, Timestamp, Year};
use crate::units::Units;
use crate::value::{Amplitude, PredictionValue};

pub const M2_SPEED: f64 = 28.984_104_2;
pub const S2_SPEED: f64 = 30.0;
pub const FIRST_YEAR: i32 = 1990;
const YEARS: i32 = 60;

pub fn epoch(year: i32) -> Timestamp {
    Timestamp::start_of_year(Year::new(year)).unwrap()
}

/// Start of the table; phases of [`seamless`] constituents count from here.
pub fn origin() -> Timestamp {
    epoch(FIRST_YEAR)
}

/// A constituent whose equilibrium arguments make it the single sinusoid
/// `amp·cos(ω·(t − origin()))` through every year. `nod_step` (node factor
/// growth per year) and `arg_drift` (degrees per year) add deliberate jumps
/// at each New Year.
pub fn seamless(
    name: &str,
    speed: f64,
    amp: f64,
    units: Units,
    nod_step: f64,
    arg_drift: f64,
) -> Constituent {
    let args: Vec<f64> = (0..YEARS)
        .map(|i| {
            let hours = (epoch(FIRST_YEAR + i) - origin()).as_seconds_f64() / 3600.0;
            (speed * hours + arg_drift * i as f64) % 360.0
        })
        .collect();
    let nods: Vec<f64> = (0..YEARS).map(|i| 1.0 + nod_step * i as f64).collect();
    Constituent::new(
        name,
        speed,
        Year::new(FIRST_YEAR),
        &args,
        &nods,
        Amplitude::new(units, amp),
        0.0,
    )
    .unwrap()
}

/// Seamless set of `(speed, amplitude)` pairs with a zero datum.
pub fn seamless_set(parts: &[(f64, f64)], units: Units) -> ConstituentSet {
    let constituents = parts
        .iter()
        .enumerate()
        .map(|(i, &(speed, amp))| seamless(&format!("C{i}"), speed, amp, units, 0.0, 0.0))
        .collect();
    let datum = PredictionValue::new(units.flatten(), 0.0);
    ConstituentSet::new(constituents, datum, &SimpleOffsets::default()).unwrap()
}

pub fn seamless_station(parts: &[(f64, f64)], units: Units) -> Station {
    Station::new("Test Harbor", seamless_set(parts, units))
}

/// Phase `ω·(t − origin())` of a seamless constituent, in radians.
pub fn phase_at(speed: f64, t: Timestamp) -> f64 {
    Speed::from_degrees_per_hour(speed).radians_per_second() * (t - origin()).as_seconds_f64()
}

/// First instant after `after` at which a seamless constituent's phase is
/// `offset + k·spacing` for an integer `k`; returns the instant and `k`.
pub fn next_phase(speed: f64, after: Timestamp, spacing: f64, offset: f64) -> (Timestamp, i64) {
    let w = Speed::from_degrees_per_hour(speed).radians_per_second();
    let k = ((phase_at(speed, after) - offset) / spacing).ceil();
    let s = (offset + k * spacing) / w;
    (origin() + Interval::from_seconds_f64(s), k as i64)
}
