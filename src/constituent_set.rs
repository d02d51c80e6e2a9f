//! # Constituent Set
//!
//! The harmonic model of one station: a list of constituents plus a datum.
//! It evaluates the tide, or one of its first two time derivatives, at any
//! instant:
//!
//! ```text
//! d^k/dt^k tide(t) = Σ A_i·f_i(Y) · ω_i^k · cos(kπ/2 + ω_i·(t − epoch(Y)) + φ_i + u_i(Y))
//! ```
//!
//! where `Y` is the calendar year of `t`, `f_i(Y)` the node factor and
//! `u_i(Y)` the equilibrium argument. The datum is *not* included and knots
//! squared are *not* flattened; [`Station`](crate::station::Station) does that.
//!
//! ## Year boundaries
//!
//! Node factors and equilibrium arguments are tabulated per calendar year,
//! so the per-year sums disagree slightly at each New Year. Within
//! one hour either side of a boundary the two years' sums are blended with
//!
//! ```text
//! tide(t) = tide_L(t) + w(x)·(tide_R(t) − tide_L(t)),   x = (t − t0) / 1 h
//! w(x)    = 1/2 + (15/16)x − (5/8)x³ + (3/16)x⁵   on (−1, 1), 0 below, 1 above
//! ```
//!
//! `w` and its first two derivatives are continuous, so the blended tide has
//! continuous first and second derivatives too, which the root finder needs.
//! Derivatives of the blend follow from the Leibniz rule.
//!
//! ## Mutability
//!
//! Evaluation moves the per-year cache (`change_year`), so evaluation takes
//! `&mut self`. A set is not meant to be shared between threads; clone it
//! instead. Clones share the constituent list.

use crate::constituent::Constituent;
use crate::error::TideError;
use crate::offsets::SimpleOffsets;
use crate::time::{Angle, Interval, Timestamp, Year};
use crate::units::Units;
use crate::value::{Amplitude, PredictionValue};
use std::cmp::Ordering;
use std::f64::consts::PI;
use std::sync::Arc;

/// Highest derivative order the tide can be evaluated for.
pub const MAX_DERIV: usize = 2;

/// Half-width of the blending window around each New Year.
pub const TIDE_BLEND_INTERVAL: Interval = Interval::from_seconds(3600);

/// Constituents summed for the practical maximum amplitude.
const NUM_CONST_FOR_AMPLITUDE: usize = 6;

/// Over-estimate applied to the derivative bounds.
const MAX_DT_SAFETY: f64 = 1.1;

#[derive(Clone, Debug)]
pub struct ConstituentSet {
    constituents: Arc<[Constituent]>,
    datum: PredictionValue,
    preferred_length_units: Units,
    current_year: Year,
    amplitudes: Vec<PredictionValue>,
    phases: Vec<Angle>,
    epoch: Timestamp,
    next_epoch: Option<Timestamp>,
    max_dt: [Amplitude; MAX_DERIV + 2],
    max_amplitude_heuristic: Amplitude,
}

/// Corrected coefficients for one year.
struct YearState {
    amplitudes: Vec<PredictionValue>,
    phases: Vec<Angle>,
    epoch: Timestamp,
    next_epoch: Option<Timestamp>,
}

impl ConstituentSet {
    /// Build the set and apply simple offsets: the datum and every amplitude
    /// are scaled by `level_multiply`, `level_add` is added to the datum, and
    /// every phase is retarded by `time_add × speed` so the tide happens
    /// later.
    ///
    /// All constituents must share one valid-year range and one amplitude
    /// unit.
    pub fn new(
        mut constituents: Vec<Constituent>,
        datum: PredictionValue,
        adjustments: &SimpleOffsets,
    ) -> Result<Self, TideError> {
        let first = constituents
            .first()
            .ok_or_else(|| TideError::MalformedHarmonics("station has no constituents".into()))?;
        let (first_year, last_year) = (first.first_valid_year(), first.last_valid_year());
        let amplitude_units = first.amplitude.units();
        if amplitude_units == Units::Zulu {
            return Err(TideError::MalformedHarmonics(format!(
                "constituent {} has no amplitude units",
                first.name
            )));
        }
        for c in &constituents {
            if c.first_valid_year() != first_year || c.last_valid_year() != last_year {
                return Err(TideError::MalformedHarmonics(format!(
                    "constituent {} covers {}-{}, expected {}-{}",
                    c.name,
                    c.first_valid_year(),
                    c.last_valid_year(),
                    first_year,
                    last_year
                )));
            }
            if c.amplitude.units() != amplitude_units {
                return Err(TideError::MalformedHarmonics(format!(
                    "constituent {} is in {}, expected {}",
                    c.name,
                    c.amplitude.units(),
                    amplitude_units
                )));
            }
        }

        if !datum.val().is_finite() {
            return Err(TideError::MalformedHarmonics(format!(
                "datum {} is not finite",
                datum.val()
            )));
        }
        if !datum.is_zulu()
            && (datum.units() == Units::KnotsSquared
                || datum.units().is_current() != amplitude_units.is_current())
        {
            return Err(TideError::MalformedHarmonics(format!(
                "datum in {} does not fit constituents in {}",
                datum.units(),
                amplitude_units
            )));
        }

        // Output defaults to the units the station was authored in.
        let preferred_length_units = if !datum.is_zulu() && !datum.units().is_current() {
            datum.units()
        } else if !amplitude_units.is_current() {
            amplitude_units
        } else {
            Units::Meters
        };

        let mut datum = datum;
        datum *= adjustments.level_multiply();
        datum.convert_and_add(adjustments.level_add());
        for c in constituents.iter_mut() {
            c.amplitude *= adjustments.level_multiply();
            c.phase -= adjustments.time_add() * c.speed;
        }

        // Amplitude times node factor for every supported year.
        let mut all_amps: Vec<Vec<Amplitude>> = Vec::new();
        let mut year = first_year;
        while year <= last_year {
            let mut row = Vec::with_capacity(constituents.len());
            for c in &constituents {
                let nod = c.nod(year)?;
                if !(nod >= 0.0) {
                    return Err(TideError::MalformedHarmonics(format!(
                        "constituent {} has node factor {nod} in {year}",
                        c.name
                    )));
                }
                row.push(c.amplitude * nod);
            }
            all_amps.push(row);
            year = year + 1;
        }

        let mut max_dt = [Amplitude::zero(); MAX_DERIV + 2];
        for (deriv, bound) in max_dt.iter_mut().enumerate() {
            for row in &all_amps {
                let mut max = Amplitude::zero();
                for (amp, c) in row.iter().zip(&constituents) {
                    max += *amp * c.speed.radians_per_second().powi(deriv as i32);
                }
                if max > *bound {
                    *bound = max;
                }
            }
            *bound *= MAX_DT_SAFETY;
        }

        // Practical amplitude from the biggest few constituents of each year.
        // Not an upper bound, and not meant to be.
        let mut max_amplitude_heuristic = Amplitude::zero();
        for row in all_amps.iter_mut() {
            row.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
            let mut max = Amplitude::zero();
            for amp in row.iter().take(NUM_CONST_FOR_AMPLITUDE) {
                max += *amp;
            }
            if max > max_amplitude_heuristic {
                max_amplitude_heuristic = max;
            }
        }
        if max_amplitude_heuristic.val() <= 0.0 {
            return Err(TideError::MalformedHarmonics(
                "all constituent amplitudes are zero".into(),
            ));
        }
        if max_amplitude_heuristic.units().is_hydraulic_current() {
            max_amplitude_heuristic.set_units(Units::Knots);
        }

        // The table may run past what timestamps can represent; start from a
        // year that is certainly fine.
        let current_year = [2000, 1970, 2037]
            .into_iter()
            .map(Year::new)
            .find(|y| first_year <= *y && *y <= last_year)
            .unwrap_or_else(|| Year::new((first_year.val() + last_year.val()) / 2));

        let constituents: Arc<[Constituent]> = constituents.into();
        let state = Self::year_state(&constituents, current_year)?;
        Ok(ConstituentSet {
            constituents,
            datum,
            preferred_length_units,
            current_year,
            amplitudes: state.amplitudes,
            phases: state.phases,
            epoch: state.epoch,
            next_epoch: state.next_epoch,
            max_dt,
            max_amplitude_heuristic,
        })
    }

    /// Constituents after the adjustments were folded in.
    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// First year the tables cover.
    pub fn first_valid_year(&self) -> Year {
        self.constituents[0].first_valid_year()
    }

    /// Last year the tables cover.
    pub fn last_valid_year(&self) -> Year {
        self.constituents[0].last_valid_year()
    }

    /// Year whose coefficients are cached.
    pub fn current_year(&self) -> Year {
        self.current_year
    }

    /// Change the preferred length units. Velocity units are never a
    /// preference; asking for one is a bug.
    pub fn set_units(&mut self, units: Units) {
        assert!(
            units != Units::KnotsSquared,
            "knots squared can never be the preferred units"
        );
        assert!(
            !units.is_current(),
            "preferred units must be a length, not {units}"
        );
        self.preferred_length_units = units;
    }

    /// Units of predictions: the constituents' own units for currents, the
    /// preferred length units otherwise.
    pub fn predict_units(&self) -> Units {
        let native = self.constituents[0].amplitude.units();
        if native.is_current() {
            native
        } else {
            self.preferred_length_units
        }
    }

    /// Rough peak amplitude, in predict units.
    pub fn max_amplitude_heuristic(&self) -> Amplitude {
        self.prefer_amplitude(self.max_amplitude_heuristic)
    }

    /// Datum after adjustments, in predict units.
    pub fn datum(&self) -> PredictionValue {
        self.prefer(self.datum)
    }

    /// Bound on |d^deriv tide / dt^deriv| over all supported years.
    /// Available one order beyond [`MAX_DERIV`].
    pub fn tide_derivative_max(&self, deriv: usize) -> Amplitude {
        assert!(deriv <= MAX_DERIV + 1, "no bound for derivative {deriv}");
        self.prefer_amplitude(self.max_dt[deriv])
    }

    fn prefer(&self, v: PredictionValue) -> PredictionValue {
        if !v.is_zulu() && !v.units().is_current() {
            v.in_units(self.preferred_length_units)
        } else {
            v
        }
    }

    fn prefer_amplitude(&self, a: Amplitude) -> Amplitude {
        if a.units() != Units::Zulu && !a.units().is_current() {
            a.in_units(self.preferred_length_units)
        } else {
            a
        }
    }

    fn year_state(constituents: &[Constituent], year: Year) -> Result<YearState, TideError> {
        let mut amplitudes = Vec::with_capacity(constituents.len());
        let mut phases = Vec::with_capacity(constituents.len());
        for c in constituents {
            amplitudes.push(PredictionValue::from(c.amplitude * c.nod(year)?));
            // Phases are already −κ'.
            phases.push(c.phase + c.arg(year)?);
        }
        let epoch = Timestamp::start_of_year(year).ok_or(TideError::TimestampOverflow { year })?;
        // A missing next epoch only disables blending at the end of the year.
        let next_epoch = Timestamp::start_of_year(year + 1);
        Ok(YearState {
            amplitudes,
            phases,
            epoch,
            next_epoch,
        })
    }

    /// Recompute corrected amplitudes, phases and epochs for `year`. The
    /// cache is left untouched on error.
    pub fn change_year(&mut self, year: Year) -> Result<(), TideError> {
        let state = Self::year_state(&self.constituents, year)?;
        self.amplitudes = state.amplitudes;
        self.phases = state.phases;
        self.epoch = state.epoch;
        self.next_epoch = state.next_epoch;
        self.current_year = year;
        tracing::trace!(year = %year, "constituent year changed");
        Ok(())
    }

    /// `deriv`th derivative with the cached year's coefficients, no year
    /// check and no blending.
    fn tide_derivative_since_epoch(&self, since_epoch: Interval, deriv: usize) -> PredictionValue {
        let tempd = Angle::from_radians(PI / 2.0 * deriv as f64);
        let mut dt_tide = PredictionValue::zero();
        for ((c, amplitude), phase) in self
            .constituents
            .iter()
            .zip(&self.amplitudes)
            .zip(&self.phases)
        {
            let mut term = *amplitude * (tempd + c.speed * since_epoch + *phase).cos();
            term *= c.speed.radians_per_second().powi(deriv as i32);
            dt_tide += term;
        }
        dt_tide
    }

    /// Unblended `deriv`th derivative at `t` using the coefficients of
    /// `year`, which need not contain `t`.
    pub fn tide_derivative_in_year(
        &mut self,
        t: Timestamp,
        year: Year,
        deriv: usize,
    ) -> Result<PredictionValue, TideError> {
        assert!(deriv <= MAX_DERIV, "derivative {deriv} is not supported");
        if year != self.current_year {
            self.change_year(year)?;
        }
        Ok(self.prefer(self.tide_derivative_since_epoch(t - self.epoch, deriv)))
    }

    /// Blend `first_year` and the year after it at `predict_time`.
    /// `blend` is the signed distance from the boundary in blend windows.
    fn blend_tide(
        &mut self,
        predict_time: Timestamp,
        deriv: usize,
        first_year: Year,
        blend: f64,
    ) -> Result<PredictionValue, TideError> {
        assert!(deriv <= MAX_DERIV);
        let mut fl = [PredictionValue::zero(); MAX_DERIV + 1];
        let mut fr = [PredictionValue::zero(); MAX_DERIV + 1];

        // Use whichever of the two years is already cached first.
        let left_first = if self.current_year == first_year + 1 {
            false
        } else {
            if self.current_year != first_year {
                self.change_year(first_year)?;
            }
            true
        };

        let since_epoch = predict_time - self.epoch;
        for n in 0..=deriv {
            let v = self.tide_derivative_since_epoch(since_epoch, n);
            if left_first {
                fl[n] = v;
            } else {
                fr[n] = v;
            }
        }

        self.change_year(if left_first { first_year + 1 } else { first_year })?;
        let since_epoch = predict_time - self.epoch;
        let mut w = [0.0; MAX_DERIV + 1];
        for n in 0..=deriv {
            let v = self.tide_derivative_since_epoch(since_epoch, n);
            if left_first {
                fr[n] = v;
            } else {
                fl[n] = v;
            }
            w[n] = blend_weight(blend, n);
        }

        // d^k/dt^k [fl + w((t - t0)/T)·(fr - fl)], Leibniz rule.
        let mut fact = 1.0;
        let mut f = fl[deriv];
        for n in 0..=deriv {
            f += fact * w[n] * (fr[deriv - n] - fl[deriv - n]);
            fact *= (deriv - n) as f64 / (n + 1) as f64 / TIDE_BLEND_INTERVAL.as_seconds_f64();
        }
        Ok(f)
    }

    /// `deriv`th time derivative of the tide at `predict_time`, blended
    /// across year boundaries. Excludes the datum; knots squared stay
    /// squared.
    pub fn tide_derivative(
        &mut self,
        predict_time: Timestamp,
        deriv: usize,
    ) -> Result<PredictionValue, TideError> {
        assert!(deriv <= MAX_DERIV, "derivative {deriv} is not supported");
        let year = predict_time.year();
        if year != self.current_year {
            self.change_year(year)?;
        }

        let since_epoch = predict_time - self.epoch;
        if since_epoch <= TIDE_BLEND_INTERVAL {
            let first_year = self.current_year - 1;
            let v = self.blend_tide(
                predict_time,
                deriv,
                first_year,
                since_epoch / TIDE_BLEND_INTERVAL,
            )?;
            return Ok(self.prefer(v));
        }
        if let Some(next_epoch) = self.next_epoch {
            let till_next_epoch = next_epoch - predict_time;
            if till_next_epoch <= TIDE_BLEND_INTERVAL {
                let first_year = self.current_year;
                let v = self.blend_tide(
                    predict_time,
                    deriv,
                    first_year,
                    -(till_next_epoch / TIDE_BLEND_INTERVAL),
                )?;
                return Ok(self.prefer(v));
            }
        }

        Ok(self.prefer(self.tide_derivative_since_epoch(since_epoch, deriv)))
    }
}

/// `deriv`th derivative of the blending function w(x).
fn blend_weight(x: f64, deriv: usize) -> f64 {
    let x2 = x * x;
    if x2 >= 1.0 {
        return if deriv == 0 && x > 0.0 { 1.0 } else { 0.0 };
    }
    match deriv {
        0 => ((3.0 * x2 - 10.0) * x2 + 15.0) * x / 16.0 + 0.5,
        1 => ((x2 - 2.0) * x2 + 1.0) * (15.0 / 16.0),
        2 => (x2 - 1.0) * x * (15.0 / 4.0),
        _ => panic!("blend weight derivative {deriv} is not supported"),
    }
}
