//! # Station Event Prediction
//!
//! A [`Station`] wraps one [`ConstituentSet`] with a name, an optional mark
//! level and a raw-reading step, and turns the continuous tide signal into
//! discrete events.
//!
//! ## Finding events
//!
//! Extrema are zeros of the first derivative. Starting from some instant,
//! [`Station::next_max_min`] steps forward until the derivative changes
//! sign, then [`Station::find_zero`] narrows the bracket down to
//! [`EVENT_PRECISION`]. Step sizes come from bounds on the second and third
//! derivatives, so a step can never jump over two extrema; they are also
//! capped at [`HALF_CYCLE`].
//!
//! Between two consecutive extrema the tide is monotonic, so each mark level
//! (and slack water, the zero level of a current) is crossed at most once
//! there and the two extrema already bracket the crossing.
//!
//! ## Results
//!
//! Events go into a caller-owned [`TideEventsOrganizer`]. Only events inside
//! the requested `[start, end)` window are added, and the organizer drops
//! the near-duplicates that overlapping requests produce.

use crate::constituent_set::ConstituentSet;
use crate::error::TideError;
use crate::event::{EventFilter, EventKind, TideEvent, TideEventsOrganizer};
use crate::time::{Interval, Timestamp, EVENT_PRECISION, EVENT_SAFETY_MARGIN, HALF_CYCLE};
use crate::units::Units;
use crate::value::PredictionValue;

/// Function whose zeros [`Station::find_zero`] looks for.
#[derive(Clone, Copy, Debug)]
pub enum ZeroFn {
    /// First derivative of the tide; zero at maxima and minima.
    MaxMin,
    /// Tide minus a level in the set's prediction units (knots squared
    /// for hydraulic currents, datum already removed).
    Mark(PredictionValue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Debug)]
pub struct Station {
    pub name: String,
    constituents: ConstituentSet,
    mark_level: Option<PredictionValue>,
    step: Interval,
    is_current: bool,
}

impl Station {
    /// No mark level, one-hour raw step.
    pub fn new(name: impl Into<String>, constituents: ConstituentSet) -> Self {
        let is_current = constituents.predict_units().is_current();
        Station {
            name: name.into(),
            constituents,
            mark_level: None,
            step: Interval::from_hours(1),
            is_current,
        }
    }

    /// True for current stations, whose levels are speeds.
    pub fn is_current(&self) -> bool {
        self.is_current
    }

    /// The underlying constituent set.
    pub fn constituents(&self) -> &ConstituentSet {
        &self.constituents
    }

    /// Units of returned levels. Knots for every current station.
    pub fn predict_units(&self) -> Units {
        self.constituents.predict_units().flatten()
    }

    /// Switch output to other length units. Current stations always predict
    /// in knots and ignore this.
    pub fn set_units(&mut self, units: Units) {
        if self.is_current {
            return;
        }
        self.constituents.set_units(units);
        if let Some(mark) = self.mark_level.as_mut() {
            if mark.units() != units {
                mark.set_units(units);
            }
        }
    }

    /// Level whose crossings are reported, if any.
    pub fn mark_level(&self) -> Option<PredictionValue> {
        self.mark_level
    }

    /// The mark is kept in [`predict_units`](Self::predict_units).
    pub fn set_mark_level(&mut self, mark: Option<PredictionValue>) {
        let units = self.predict_units();
        self.mark_level = mark.map(|m| if m.is_zulu() { m } else { m.in_units(units) });
    }

    /// Spacing of raw readings.
    pub fn step(&self) -> Interval {
        self.step
    }

    /// Panics unless `step` is positive.
    pub fn set_step(&mut self, step: Interval) {
        assert!(step > Interval::ZERO, "raw reading step must be positive");
        self.step = step;
    }

    /// Rough lowest level: datum minus the amplitude heuristic.
    pub fn min_level_heuristic(&self) -> PredictionValue {
        self.constituents.datum() - PredictionValue::from(self.constituents.max_amplitude_heuristic())
    }

    /// Rough highest level: datum plus the amplitude heuristic.
    pub fn max_level_heuristic(&self) -> PredictionValue {
        self.constituents.datum() + PredictionValue::from(self.constituents.max_amplitude_heuristic())
    }

    /// Tide level at `t`: datum included, currents in knots.
    pub fn predict_tide_level(&mut self, t: Timestamp) -> Result<PredictionValue, TideError> {
        let pv = self.constituents.tide_derivative(t, 0)?;
        Ok(self.finish_prediction_value(pv))
    }

    fn finish_prediction_value(&self, mut pv: PredictionValue) -> PredictionValue {
        if !pv.is_zulu() && pv.units().is_hydraulic_current() {
            pv.set_units(pv.units().flatten());
        }
        pv += self.constituents.datum();
        pv
    }

    fn finish_tide_event(&mut self, time: Timestamp, kind: EventKind) -> Result<TideEvent, TideError> {
        Ok(TideEvent {
            time,
            kind,
            level: self.predict_tide_level(time)?,
            is_current: self.is_current,
        })
    }

    fn zero_fn(&mut self, f: ZeroFn, t: Timestamp, deriv: usize) -> Result<f64, TideError> {
        Ok(match f {
            ZeroFn::MaxMin => self.constituents.tide_derivative(t, deriv + 1)?.val(),
            ZeroFn::Mark(level) => {
                let mut pv = self.constituents.tide_derivative(t, deriv)?;
                if deriv == 0 {
                    pv -= level;
                }
                pv.val()
            }
        })
    }

    /// Zero of `f` inside `(tl, tr)`, where `f` is nonzero with opposite
    /// signs at the two ends. The result is an exact zero or lies at most
    /// [`EVENT_PRECISION`] past the zero, never before it. When the right
    /// end never moved, one second inside it is preferred if that is still
    /// past the zero.
    ///
    /// Bisects first, then takes Newton steps while they stay inside the
    /// bracket and at least halve |f|.
    ///
    /// # Panics
    ///
    /// If the bracket is empty or does not straddle a sign change.
    pub fn find_zero(
        &mut self,
        tl: Timestamp,
        tr: Timestamp,
        f: ZeroFn,
    ) -> Result<Timestamp, TideError> {
        let (original_tl, original_tr) = (tl, tr);
        let (mut tl, mut tr) = (tl, tr);
        let mut fl = self.zero_fn(f, tl, 0)?;
        let mut fr = self.zero_fn(f, tr, 0)?;
        assert!(fl != 0.0 && fr != 0.0, "bracket end is already a zero");
        assert!(tl < tr, "empty bracket {tl} .. {tr}");
        let scale = if fl > 0.0 { -1.0 } else { 1.0 };
        fl *= scale;
        fr *= scale;
        assert!(fl < 0.0 && fr > 0.0, "bracket does not straddle a zero");

        let mut last: Option<Timestamp> = None;
        let (mut ft, mut fp, mut f_thresh) = (0.0_f64, 0.0_f64, 0.0_f64);
        while tr - tl > EVENT_PRECISION {
            let mut newton = None;
            if let Some(t) = last {
                let too_slow = ft.abs() > f_thresh;
                let leaves_bracket = if ft > 0.0 {
                    fp <= ft / (t - tl).as_seconds_f64()
                } else {
                    fp <= -ft / (tr - t).as_seconds_f64()
                };
                if !too_slow && !leaves_bracket {
                    let mut dt = Interval::from_seconds_f64(-ft / fp);
                    // Overshooting the root shrinks the bracket faster than
                    // creeping up on it from one side.
                    if dt.abs() < EVENT_PRECISION {
                        dt = if ft < 0.0 { EVENT_PRECISION } else { -EVENT_PRECISION };
                    }
                    f_thresh = ft.abs() / 2.0;
                    let next = t + dt;
                    if next > tl && next < tr {
                        newton = Some(next);
                    }
                }
            }

            let t = match newton {
                Some(t) => t,
                None => {
                    f_thresh = fr.max(-fl);
                    tl + (tr - tl) / 2
                }
            };

            ft = scale * self.zero_fn(f, t, 0)?;
            if ft == 0.0 {
                return Ok(t);
            }
            if ft > 0.0 {
                tr = t;
                fr = ft;
            } else {
                tl = t;
                fl = ft;
            }
            fp = scale * self.zero_fn(f, t, 1)?;
            last = Some(t);
        }

        if tr == original_tr {
            let inside = tr - Interval::from_seconds(1);
            if inside > original_tl && scale * self.zero_fn(f, inside, 0)? >= 0.0 {
                return Ok(inside);
            }
        }
        Ok(tr)
    }

    /// Next maximum or minimum after `t`.
    ///
    /// The kind follows from the slope at the start of the search: rising
    /// toward a maximum, falling toward a minimum.
    pub fn next_max_min(&mut self, t: Timestamp) -> Result<(Timestamp, EventKind), TideError> {
        let max_fp = self.constituents.tide_derivative_max(2).val();
        let max_fpp = self.constituents.tide_derivative_max(3).val();
        if max_fp <= 0.0 || max_fpp <= 0.0 {
            return Err(TideError::FlatSignal);
        }
        let max_step = HALF_CYCLE.as_seconds_f64();

        let mut t_left = t;
        let mut f_left = self.zero_fn(ZeroFn::MaxMin, t_left, 0)?;
        while f_left == 0.0 {
            t_left += EVENT_PRECISION;
            f_left = self.zero_fn(ZeroFn::MaxMin, t_left, 0)?;
        }

        let (kind, scale) = if f_left < 0.0 {
            (EventKind::Min, 1.0)
        } else {
            (EventKind::Max, -1.0)
        };
        f_left *= scale;

        loop {
            // Shortest time to the next zero, and to the next turning point.
            let step1 = (f_left.abs() / max_fp).min(max_step);
            let df_left = scale * self.zero_fn(ZeroFn::MaxMin, t_left, 1)?;
            let step2 = (df_left.abs() / max_fpp).min(max_step);

            let step = if df_left < 0.0 {
                step1 + step2
            } else {
                step1.max(step2)
            };
            let step = Interval::from_seconds(step.min(max_step) as i64).max(EVENT_PRECISION);

            // An exact zero with no sign change is a double root; skip it.
            let mut t_right = t_left + step;
            let mut f_right = scale * self.zero_fn(ZeroFn::MaxMin, t_right, 0)?;
            while f_right == 0.0 {
                t_right += EVENT_PRECISION;
                f_right = scale * self.zero_fn(ZeroFn::MaxMin, t_right, 0)?;
            }

            if f_right > 0.0 {
                let time = self.find_zero(t_left, t_right, ZeroFn::MaxMin)?;
                tracing::trace!(time = %time, kind = ?kind, "extremum found");
                return Ok((time, kind));
            }
            t_left = t_right;
            f_left = f_right;
        }
    }

    /// Crossing of `marklev` between `t1` and `t2`, with whether the tide is
    /// rising through it. `marklev` is in the set's prediction units with
    /// the datum removed. `None` when the level is not crossed.
    pub fn find_mark_crossing(
        &mut self,
        t1: Timestamp,
        t2: Timestamp,
        marklev: PredictionValue,
    ) -> Result<Option<(Timestamp, bool)>, TideError> {
        let (t1, t2) = if t1 > t2 { (t2, t1) } else { (t1, t2) };
        let f = ZeroFn::Mark(marklev);
        let mut f1 = self.zero_fn(f, t1, 0)?;
        let mut f2 = self.zero_fn(f, t2, 0)?;
        if f1 == f2 {
            return Ok(None);
        }

        // `||` so a zero sitting exactly on an end still gets a direction.
        let rising = f1 < 0.0 || f2 > 0.0;
        if !rising {
            f1 = -f1;
            f2 = -f2;
        }

        if f1 == 0.0 {
            return Ok(Some((t1, rising)));
        }
        if f2 == 0.0 {
            return Ok(Some((t2, rising)));
        }
        if f1 < 0.0 && f2 > 0.0 {
            return Ok(Some((self.find_zero(t1, t2, f)?, rising)));
        }
        Ok(None)
    }

    /// Like [`find_mark_crossing`](Self::find_mark_crossing) for a level
    /// given as the user sees it: datum included, currents in knots.
    pub fn find_simple_mark_crossing(
        &mut self,
        t1: Timestamp,
        t2: Timestamp,
        marklev: PredictionValue,
    ) -> Result<Option<(Timestamp, bool)>, TideError> {
        let mut marklev = marklev;
        marklev -= self.constituents.datum();
        let units = self.constituents.predict_units();
        if !marklev.is_zulu() && marklev.units() != units {
            marklev.set_units(units);
        }
        self.find_mark_crossing(t1, t2, marklev)
    }

    /// Add the events in `[start, end)` to `organizer`.
    pub fn predict_tide_events(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        organizer: &mut TideEventsOrganizer,
        filter: EventFilter,
    ) -> Result<(), TideError> {
        if start >= end {
            return Ok(());
        }
        tracing::debug!(station = %self.name, %start, %end, ?filter, "predicting tide events");
        self.add_simple_tide_events(start, end, organizer, filter)
    }

    fn add_simple_tide_events(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        organizer: &mut TideEventsOrganizer,
        filter: EventFilter,
    ) -> Result<(), TideError> {
        let in_window = |t: Timestamp| t >= start && t < end;

        // The last extremum found may lie past `end`; the crossings before
        // it can still fall inside the window.
        let mut loop_time = start;
        while loop_time <= end {
            let previous = loop_time;
            let (time, kind) = self.next_max_min(loop_time)?;
            loop_time = time;
            if in_window(time) {
                let event = self.finish_tide_event(time, kind)?;
                organizer.add(event);
            }

            if filter != EventFilter::MaxMin && self.is_current {
                let slack = PredictionValue::new(self.predict_units(), 0.0);
                if let Some((t, rising)) = self.find_simple_mark_crossing(previous, loop_time, slack)? {
                    if in_window(t) {
                        let kind = if rising { EventKind::SlackRise } else { EventKind::SlackFall };
                        let event = self.finish_tide_event(t, kind)?;
                        organizer.add(event);
                    }
                }
            }

            if let (Some(mark), EventFilter::All) = (self.mark_level, filter) {
                if let Some((t, rising)) = self.find_simple_mark_crossing(previous, loop_time, mark)? {
                    if in_window(t) {
                        let kind = if rising { EventKind::MarkRise } else { EventKind::MarkFall };
                        let event = self.finish_tide_event(t, kind)?;
                        organizer.add(event);
                    }
                }
            }
        }
        Ok(())
    }

    /// One raw reading every `step` in `[start, end)`.
    pub fn predict_raw_events(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        organizer: &mut TideEventsOrganizer,
    ) -> Result<(), TideError> {
        assert!(self.step > Interval::ZERO);
        assert!(start <= end, "raw range ends before it starts");
        let mut t = start;
        while t < end {
            let event = self.finish_tide_event(t, EventKind::RawReading)?;
            organizer.add(event);
            t += self.step;
        }
        Ok(())
    }

    /// Predict `how_much` more time of tide events beyond the last (or
    /// before the first) event already in `organizer`. The new range
    /// overlaps the old one by [`EVENT_SAFETY_MARGIN`] so nothing at the
    /// seam is lost.
    ///
    /// # Panics
    ///
    /// If `organizer` is empty or `how_much` is not positive.
    pub fn extend_range(
        &mut self,
        organizer: &mut TideEventsOrganizer,
        direction: Direction,
        how_much: Interval,
        filter: EventFilter,
    ) -> Result<(), TideError> {
        assert!(how_much > Interval::ZERO, "extension must be positive");
        let (start, end) = match direction {
            Direction::Forward => {
                let last = organizer.last().expect("cannot extend an empty organizer").time;
                (last - EVENT_SAFETY_MARGIN, last + how_much)
            }
            Direction::Backward => {
                let first = organizer.first().expect("cannot extend an empty organizer").time;
                (first - how_much, first + EVENT_SAFETY_MARGIN)
            }
        };
        self.predict_tide_events(start, end, organizer, filter)
    }

    /// Raw-reading form of [`extend_range`](Self::extend_range): `how_many`
    /// more readings on the same step grid.
    ///
    /// # Panics
    ///
    /// If `organizer` is empty or `how_many` is zero.
    pub fn extend_range_raw(
        &mut self,
        organizer: &mut TideEventsOrganizer,
        direction: Direction,
        how_many: usize,
    ) -> Result<(), TideError> {
        assert!(how_many > 0, "extension must be positive");
        let span = self.step * how_many as i64;
        let (start, end) = match direction {
            Direction::Forward => {
                let last = organizer.last().expect("cannot extend an empty organizer").time;
                (last + self.step, last + self.step + span)
            }
            Direction::Backward => {
                let first = organizer.first().expect("cannot extend an empty organizer").time;
                (first - span, first)
            }
        };
        self.predict_raw_events(start, end, organizer)
    }
}
