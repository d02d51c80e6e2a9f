//! # Harmonic Constituents
//!
//! One constituent as seen from a station: its astronomical speed, the
//! station's amplitude and phase for it, and the per-year node factors and
//! equilibrium arguments that correct both.

use crate::error::TideError;
use crate::time::{Angle, Speed, Year};
use crate::value::Amplitude;

#[derive(Clone, Debug)]
pub struct Constituent {
    pub name: String,
    pub speed: Speed,
    /// May be rescaled once by `ConstituentSet` construction.
    pub amplitude: Amplitude,
    /// Stored as −κ'. May be shifted once by `ConstituentSet` construction.
    pub phase: Angle,
    args: Vec<Angle>,
    nods: Vec<f64>,
    first_valid_year: Year,
    last_valid_year: Year,
}

impl Constituent {
    /// `args_degrees[i]` and `nodes[i]` belong to year `start_year + i`.
    /// `phase_degrees` is the Greenwich epoch κ' and is negated on input.
    pub fn new(
        name: impl Into<String>,
        speed_degrees_per_hour: f64,
        start_year: Year,
        args_degrees: &[f64],
        nodes: &[f64],
        amplitude: Amplitude,
        phase_degrees: f64,
    ) -> Result<Self, TideError> {
        let name = name.into();
        if args_degrees.is_empty() || args_degrees.len() != nodes.len() {
            return Err(TideError::MalformedHarmonics(format!(
                "constituent {name} has {} equilibrium arguments and {} node factors",
                args_degrees.len(),
                nodes.len()
            )));
        }
        if !speed_degrees_per_hour.is_finite() || !phase_degrees.is_finite() {
            return Err(TideError::MalformedHarmonics(format!(
                "constituent {name} has a non-finite speed or phase"
            )));
        }
        if args_degrees.iter().chain(nodes).any(|v| !v.is_finite()) {
            return Err(TideError::MalformedHarmonics(format!(
                "constituent {name} has a non-finite equilibrium argument or node factor"
            )));
        }
        Ok(Constituent {
            speed: Speed::from_degrees_per_hour(speed_degrees_per_hour),
            amplitude,
            phase: Angle::from_degrees(-phase_degrees),
            args: args_degrees.iter().map(|&d| Angle::from_degrees(d)).collect(),
            nods: nodes.to_vec(),
            first_valid_year: start_year,
            last_valid_year: start_year + (args_degrees.len() as i32 - 1),
            name,
        })
    }

    /// Year of the first table entry.
    pub fn first_valid_year(&self) -> Year {
        self.first_valid_year
    }

    /// Year of the last table entry.
    pub fn last_valid_year(&self) -> Year {
        self.last_valid_year
    }

    fn index(&self, year: Year) -> Result<usize, TideError> {
        if year < self.first_valid_year || year > self.last_valid_year {
            return Err(TideError::YearNotInTable {
                year,
                first: self.first_valid_year,
                last: self.last_valid_year,
            });
        }
        Ok((year.val() - self.first_valid_year.val()) as usize)
    }

    /// Equilibrium argument for `year`.
    pub fn arg(&self, year: Year) -> Result<Angle, TideError> {
        Ok(self.args[self.index(year)?])
    }

    /// Node factor for `year`.
    pub fn nod(&self, year: Year) -> Result<f64, TideError> {
        Ok(self.nods[self.index(year)?])
    }
}
