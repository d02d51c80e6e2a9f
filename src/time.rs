//! # Time and Phase Types
//!
//! Thin wrappers that keep angles, angular speeds, durations, years and
//! instants from being mixed up with plain numbers:
//!
//! - [`Angle`]: radians. Only adds to angles and only meets `f64` through
//!   `cos`/`sin`.
//! - [`Speed`]: radians per second. `Speed * Interval` is an `Angle`.
//! - [`Interval`]: a signed count of whole seconds.
//! - [`Year`]: a proleptic Gregorian calendar year.
//! - [`Timestamp`]: a POSIX instant at whole-second resolution. A missing
//!   timestamp is `Option<Timestamp>`, so arithmetic on "null" cannot be
//!   written.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

pub const HOUR_SECONDS: i64 = 3600;
pub const DAY_SECONDS: i64 = 86_400;

/// Search resolution of the root finder.
pub const EVENT_PRECISION: Interval = Interval::from_seconds(15);

/// Two events of the same kind closer than this are the same event.
/// Must exceed [`EVENT_PRECISION`].
pub const EVENT_SAFETY_MARGIN: Interval = Interval::from_seconds(60);

/// Period of the M4 quarter-diurnal constituent (57.9682084 deg/h), rounded.
/// Upper bound on the step taken while bracketing the next extremum.
pub const HALF_CYCLE: Interval = Interval::from_seconds(22_357);

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle {
    radians: f64,
}

impl Angle {
    pub const ZERO: Angle = Angle { radians: 0.0 };

    pub const fn from_radians(radians: f64) -> Self {
        Angle { radians }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Angle {
            radians: degrees * PI / 180.0,
        }
    }

    pub fn radians(self) -> f64 {
        self.radians
    }

    pub fn degrees(self) -> f64 {
        self.radians * 180.0 / PI
    }

    pub fn cos(self) -> f64 {
        self.radians.cos()
    }

    pub fn sin(self) -> f64 {
        self.radians.sin()
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.radians + rhs.radians)
    }
}

impl Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.radians - rhs.radians)
    }
}

impl Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle::from_radians(-self.radians)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        self.radians += rhs.radians;
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        self.radians -= rhs.radians;
    }
}

/// Angular speed of a constituent.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Speed {
    radians_per_second: f64,
}

impl Speed {
    pub fn from_degrees_per_hour(degrees_per_hour: f64) -> Self {
        Speed {
            radians_per_second: degrees_per_hour * PI / 180.0 / HOUR_SECONDS as f64,
        }
    }

    pub fn radians_per_second(self) -> f64 {
        self.radians_per_second
    }

    pub fn degrees_per_hour(self) -> f64 {
        self.radians_per_second * 180.0 / PI * HOUR_SECONDS as f64
    }
}

impl Mul<Interval> for Speed {
    type Output = Angle;
    fn mul(self, rhs: Interval) -> Angle {
        Angle::from_radians(self.radians_per_second * rhs.seconds() as f64)
    }
}

impl Mul<Speed> for Interval {
    type Output = Angle;
    fn mul(self, rhs: Speed) -> Angle {
        rhs * self
    }
}

/// Signed duration in whole seconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Interval(i64);

impl Interval {
    pub const ZERO: Interval = Interval(0);

    pub const fn from_seconds(seconds: i64) -> Self {
        Interval(seconds)
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Interval(minutes * 60)
    }

    pub const fn from_hours(hours: i64) -> Self {
        Interval(hours * HOUR_SECONDS)
    }

    pub const fn from_days(days: i64) -> Self {
        Interval(days * DAY_SECONDS)
    }

    /// Round to the nearest second, halves away from zero.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        Interval(seconds.round() as i64)
    }

    pub const fn seconds(self) -> i64 {
        self.0
    }

    pub fn as_seconds_f64(self) -> f64 {
        self.0 as f64
    }

    pub fn abs(self) -> Interval {
        Interval(self.0.abs())
    }
}

impl Add for Interval {
    type Output = Interval;
    fn add(self, rhs: Interval) -> Interval {
        Interval(self.0 + rhs.0)
    }
}

impl Sub for Interval {
    type Output = Interval;
    fn sub(self, rhs: Interval) -> Interval {
        Interval(self.0 - rhs.0)
    }
}

impl Neg for Interval {
    type Output = Interval;
    fn neg(self) -> Interval {
        Interval(-self.0)
    }
}

impl Mul<i64> for Interval {
    type Output = Interval;
    fn mul(self, rhs: i64) -> Interval {
        Interval(self.0 * rhs)
    }
}

impl Div<i64> for Interval {
    type Output = Interval;
    fn div(self, rhs: i64) -> Interval {
        Interval(self.0 / rhs)
    }
}

/// Ratio of two intervals.
impl Div for Interval {
    type Output = f64;
    fn div(self, rhs: Interval) -> f64 {
        self.0 as f64 / rhs.0 as f64
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let s = self.0.abs();
        write!(f, "{}{}:{:02}:{:02}", sign, s / HOUR_SECONDS, (s / 60) % 60, s % 60)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Year(i32);

impl Year {
    pub const fn new(year: i32) -> Self {
        Year(year)
    }

    pub const fn val(self) -> i32 {
        self.0
    }
}

impl Add<i32> for Year {
    type Output = Year;
    fn add(self, rhs: i32) -> Year {
        Year(self.0 + rhs)
    }
}

impl Sub<i32> for Year {
    type Output = Year;
    fn sub(self, rhs: i32) -> Year {
        Year(self.0 - rhs)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in time, UTC, whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// `None` if the instant is outside what chrono can represent.
    pub fn from_unix(seconds: i64) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(Timestamp)
    }

    /// 00:00:00 UTC on January 1 of `year`, if representable.
    pub fn start_of_year(year: Year) -> Option<Self> {
        NaiveDate::from_ymd_opt(year.val(), 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Timestamp(Utc.from_utc_datetime(&dt)))
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Timestamp(DateTime::from_timestamp(datetime.timestamp(), 0).unwrap_or(datetime))
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn unix(self) -> i64 {
        self.0.timestamp()
    }

    pub fn datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar year (UTC) containing this instant.
    pub fn year(self) -> Year {
        Year(self.0.year())
    }

    /// `self + rhs`, or `None` past the range chrono can represent.
    pub fn checked_add(self, rhs: Interval) -> Option<Timestamp> {
        chrono::Duration::try_seconds(rhs.seconds())
            .and_then(|d| self.0.checked_add_signed(d))
            .map(Timestamp)
    }
}

impl Add<Interval> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Interval) -> Timestamp {
        Timestamp(self.0 + chrono::Duration::seconds(rhs.seconds()))
    }
}

impl Sub<Interval> for Timestamp {
    type Output = Timestamp;
    fn sub(self, rhs: Interval) -> Timestamp {
        Timestamp(self.0 - chrono::Duration::seconds(rhs.seconds()))
    }
}

impl AddAssign<Interval> for Timestamp {
    fn add_assign(&mut self, rhs: Interval) {
        *self = *self + rhs;
    }
}

impl SubAssign<Interval> for Timestamp {
    fn sub_assign(&mut self, rhs: Interval) {
        *self = *self - rhs;
    }
}

impl Sub for Timestamp {
    type Output = Interval;
    fn sub(self, rhs: Timestamp) -> Interval {
        Interval((self.0 - rhs.0).num_seconds())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn safety_margin_exceeds_precision() {
        assert!(EVENT_SAFETY_MARGIN > EVENT_PRECISION);
        assert_eq!(
            HALF_CYCLE,
            Interval::from_seconds_f64(360.0 * HOUR_SECONDS as f64 / 57.968_208_4)
        );
    }

    #[test]
    fn speed_times_interval_is_angle() {
        let m2 = Speed::from_degrees_per_hour(28.984_104_2);
        let angle = m2 * Interval::from_hours(1);
        assert_relative_eq!(angle.degrees(), 28.984_104_2, epsilon = 1e-9);
        assert_relative_eq!(m2.degrees_per_hour(), 28.984_104_2, epsilon = 1e-9);
    }

    #[test]
    fn start_of_year_and_year_extraction() {
        let t = Timestamp::start_of_year(Year::new(2024)).unwrap();
        assert_eq!(t.unix(), 1_704_067_200);
        assert_eq!(t.year(), Year::new(2024));
        assert_eq!((t - Interval::from_seconds(1)).year(), Year::new(2023));
        let next = Timestamp::start_of_year(Year::new(2025)).unwrap();
        assert_eq!(next - t, Interval::from_days(366));
    }

    #[test]
    fn unrepresentable_year_has_no_start() {
        assert!(Timestamp::start_of_year(Year::new(i32::MAX)).is_none());
    }

    #[test]
    fn checked_add_stops_at_the_calendar_edge() {
        let t = Timestamp::start_of_year(Year::new(2024)).unwrap();
        assert_eq!(t.checked_add(Interval::from_days(366)), Timestamp::start_of_year(Year::new(2025)));
        assert!(t.checked_add(Interval::from_days(i64::from(u32::MAX))).is_none());
        assert!(t.checked_add(Interval::from_seconds(i64::MAX)).is_none());
    }

    #[test]
    fn interval_display_and_ratio() {
        assert_eq!(Interval::from_seconds(3725).to_string(), "1:02:05");
        assert_eq!(Interval::from_seconds(-60).to_string(), "-0:01:00");
        assert_relative_eq!(Interval::from_minutes(30) / Interval::from_hours(1), 0.5);
    }
}
