//! # Harmonics Records
//!
//! Plain serde records describing a station's harmonic constants, and the
//! [`HarmonicsSource`] seam through which the engine obtains them. Records
//! are deliberately dumb: units are text, phases are degrees, and nothing is
//! validated until [`StationRecord::into_station`] builds the engine types.
//!
//! ## File Layout
//!
//! A station file (TOML shown, JSON has the same shape):
//!
//! ```toml
//! name = "Example Harbor"
//! units = "feet"          # amplitude units: feet, meters, knots, knots^2
//! first_year = 1990       # year of args[0] and nodes[0]
//!
//! [datum]
//! value = 5.0             # units default to the amplitude units
//!
//! [kind]
//! type = "simple_offset_subordinate"
//! offsets = { time_add_minutes = 30, level_multiply = 1.1 }
//!
//! [[constituents]]
//! name = "M2"
//! speed = 28.9841042      # degrees per hour
//! amplitude = 4.5
//! phase = 110.2           # Greenwich epoch, degrees
//! args = [ ... ]          # equilibrium arguments, degrees, one per year
//! nodes = [ ... ]         # node factors, one per year
//! ```

use crate::config::Settings;
use crate::constituent::Constituent;
use crate::constituent_set::ConstituentSet;
use crate::error::TideError;
use crate::offsets::SimpleOffsets;
use crate::station::Station;
use crate::time::{Interval, Year};
use crate::units::Units;
use crate::value::{Amplitude, PredictionValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Anything that can look up a station's harmonic constants by name.
pub trait HarmonicsSource {
    fn load_station(&self, name: &str) -> Result<StationRecord, TideError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstituentRecord {
    pub name: String,
    /// Degrees per hour.
    pub speed: f64,
    pub amplitude: f64,
    /// Greenwich epoch κ' in degrees.
    pub phase: f64,
    pub args: Vec<f64>,
    pub nodes: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatumRecord {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Simple offsets as written in station files. `level_add` is in the
/// station's datum units; a `level_multiply` of zero means none.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetsRecord {
    pub time_add_minutes: i64,
    pub level_add: f64,
    pub level_multiply: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StationKind {
    #[default]
    Reference,
    SimpleOffsetSubordinate { offsets: OffsetsRecord },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub name: String,
    pub units: String,
    pub first_year: i32,
    #[serde(default)]
    pub datum: DatumRecord,
    #[serde(default)]
    pub kind: StationKind,
    pub constituents: Vec<ConstituentRecord>,
}

impl ConstituentRecord {
    fn to_constituent(&self, first_year: Year, units: Units) -> Result<Constituent, TideError> {
        if !(self.amplitude >= 0.0) {
            return Err(TideError::MalformedHarmonics(format!(
                "constituent {} has amplitude {}",
                self.name, self.amplitude
            )));
        }
        Constituent::new(
            self.name.as_str(),
            self.speed,
            first_year,
            &self.args,
            &self.nodes,
            Amplitude::new(units, self.amplitude),
            self.phase,
        )
    }
}

impl OffsetsRecord {
    fn to_offsets(&self, level_units: Units) -> Result<SimpleOffsets, TideError> {
        if !(self.level_multiply >= 0.0) || self.level_multiply.is_infinite() {
            return Err(TideError::MalformedHarmonics(format!(
                "level multiplier {} must be finite and non-negative",
                self.level_multiply
            )));
        }
        if !self.level_add.is_finite() {
            return Err(TideError::MalformedHarmonics(format!(
                "level offset {} is not finite",
                self.level_add
            )));
        }
        let level_add = if self.level_add == 0.0 {
            PredictionValue::zero()
        } else {
            PredictionValue::new(level_units, self.level_add)
        };
        Ok(SimpleOffsets::new(
            Interval::from_minutes(self.time_add_minutes),
            level_add,
            self.level_multiply,
        ))
    }
}

impl StationRecord {
    pub fn from_toml_str(contents: &str) -> Result<Self, TideError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, TideError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Read a station file; `.json` files are JSON, everything else TOML.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let record = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            _ => Self::from_toml_str(&contents)?,
        };
        tracing::info!(path = %path.display(), station = %record.name, "loaded station");
        Ok(record)
    }

    /// Build a ready-to-predict station: constituents, datum and simple
    /// offsets go into the constituent set, then the settings' units, mark
    /// level and step are applied.
    pub fn into_station(&self, settings: &Settings) -> Result<Station, TideError> {
        let units = Units::parse(&self.units)?;
        let first_year = Year::new(self.first_year);
        let constituents = self
            .constituents
            .iter()
            .map(|c| c.to_constituent(first_year, units))
            .collect::<Result<Vec<_>, _>>()?;

        let datum_units = match &self.datum.units {
            Some(text) => Units::parse(text)?,
            None => units.flatten(),
        };
        if !self.datum.value.is_finite() {
            return Err(TideError::MalformedHarmonics(format!(
                "datum {} is not finite",
                self.datum.value
            )));
        }
        let datum = PredictionValue::new(datum_units, self.datum.value);

        let offsets = match &self.kind {
            StationKind::Reference => SimpleOffsets::default(),
            StationKind::SimpleOffsetSubordinate { offsets } => offsets.to_offsets(datum_units)?,
        };

        let set = ConstituentSet::new(constituents, datum, &offsets)?;
        let mut station = Station::new(self.name.as_str(), set);

        if let Some(preferred) = settings.preferred_units() {
            if !station.is_current() && preferred != station.predict_units() {
                station.set_units(preferred);
            }
        }
        if let Some(level) = settings.mark_level {
            station.set_mark_level(Some(PredictionValue::new(station.predict_units(), level)));
        }
        station.set_step(settings.step());

        tracing::debug!(
            station = %station.name,
            constituents = self.constituents.len(),
            units = %station.predict_units(),
            "built station"
        );
        Ok(station)
    }
}

/// Stations held in memory, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHarmonics {
    stations: HashMap<String, StationRecord>,
}

impl InMemoryHarmonics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any station of the same name.
    pub fn insert(&mut self, record: StationRecord) {
        self.stations.insert(record.name.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl FromIterator<StationRecord> for InMemoryHarmonics {
    fn from_iter<I: IntoIterator<Item = StationRecord>>(iter: I) -> Self {
        let mut source = InMemoryHarmonics::new();
        for record in iter {
            source.insert(record);
        }
        source
    }
}

impl HarmonicsSource for InMemoryHarmonics {
    fn load_station(&self, name: &str) -> Result<StationRecord, TideError> {
        self.stations
            .get(name)
            .cloned()
            .ok_or_else(|| TideError::StationNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::epoch;
    use approx::assert_relative_eq;
    use tempfile::Builder;

    const STATION_TOML: &str = r#"
name = "Example Harbor"
units = "feet"
first_year = 2020

[datum]
value = 5.0

[[constituents]]
name = "M2"
speed = 28.9841042
amplitude = 2.0
phase = 0.0
args = [0.0, 0.0, 0.0, 0.0, 0.0]
nodes = [1.0, 1.0, 1.0, 1.0, 1.0]
"#;

    fn record() -> StationRecord {
        StationRecord::from_toml_str(STATION_TOML).unwrap()
    }

    /// `2·cos(ω·h)` for the fixture's single constituent.
    fn wave(hours: f64) -> f64 {
        2.0 * (28.984_104_2 * hours).to_radians().cos()
    }

    #[test]
    fn toml_record_parses() {
        let r = record();
        assert_eq!(r.name, "Example Harbor");
        assert_eq!(r.kind, StationKind::Reference);
        assert_eq!(r.constituents.len(), 1);
        assert_eq!(r.datum.units, None);
    }

    #[test]
    fn builds_station_at_epoch() {
        let mut station = record().into_station(&Settings::default()).unwrap();
        assert_eq!(station.predict_units(), Units::Feet);
        // Zero phase and argument: the wave counts from New Year.
        let t = epoch(2022) + Interval::from_hours(6);
        let level = station.predict_tide_level(t).unwrap();
        assert_relative_eq!(level.val(), 5.0 + wave(6.0), epsilon = 1e-9);
        assert_eq!(station.step(), Interval::from_hours(1));
    }

    #[test]
    fn settings_apply_units_mark_and_step() {
        let mut settings = Settings::default();
        settings.set("u", "m").unwrap();
        settings.set("ml", "1.5").unwrap();
        settings.set("s", "10").unwrap();
        let mut station = record().into_station(&settings).unwrap();
        assert_eq!(station.predict_units(), Units::Meters);
        assert_eq!(station.mark_level(), Some(PredictionValue::new(Units::Meters, 1.5)));
        assert_eq!(station.step(), Interval::from_minutes(10));
        let t = epoch(2022) + Interval::from_hours(6);
        let level = station.predict_tide_level(t).unwrap();
        assert_relative_eq!(level.val(), (5.0 + wave(6.0)) * 0.3048, epsilon = 1e-9);
    }

    #[test]
    fn subordinate_offsets_scale_and_shift() {
        let mut r = record();
        r.kind = StationKind::SimpleOffsetSubordinate {
            offsets: OffsetsRecord {
                time_add_minutes: 60,
                level_add: 1.0,
                level_multiply: 2.0,
            },
        };
        let mut station = r.into_station(&Settings::default()).unwrap();
        // Datum 5·2 + 1, amplitude 2·2, wave one hour later.
        let t = epoch(2022) + Interval::from_hours(7);
        let level = station.predict_tide_level(t).unwrap();
        assert_relative_eq!(level.val(), 11.0 + 2.0 * wave(6.0), epsilon = 1e-9);
    }

    #[test]
    fn json_and_toml_describe_the_same_station() {
        let mut r = record();
        r.constituents[0].speed = 30.0;
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(StationRecord::from_json_str(&json).unwrap(), r);

        let file = Builder::new().suffix(".json").tempfile().unwrap();
        fs::write(file.path(), json).unwrap();
        assert_eq!(StationRecord::load_from_path(file.path()).unwrap(), r);
    }

    #[test]
    fn tagged_kind_in_toml() {
        let text = STATION_TOML.replace(
            "[datum]",
            "[kind]\ntype = \"simple_offset_subordinate\"\noffsets = { time_add_minutes = -15 }\n\n[datum]",
        );
        let r = StationRecord::from_toml_str(&text).unwrap();
        assert_eq!(
            r.kind,
            StationKind::SimpleOffsetSubordinate {
                offsets: OffsetsRecord {
                    time_add_minutes: -15,
                    ..OffsetsRecord::default()
                }
            }
        );
    }

    #[test]
    fn bad_records_are_errors() {
        let mut r = record();
        r.units = "fathoms".into();
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::UnrecognizedUnits(_))
        ));

        let mut r = record();
        r.constituents[0].nodes.pop();
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));

        let mut r = record();
        r.constituents[0].amplitude = -1.0;
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));

        assert!(matches!(
            StationRecord::from_toml_str("name = 3"),
            Err(TideError::Toml(_))
        ));
    }

    #[test]
    fn non_finite_constants_are_rejected_at_build() {
        // TOML happily parses `nan` and `inf`.
        let toml = STATION_TOML.replace("phase = 0.0", "phase = nan");
        let r = StationRecord::from_toml_str(&toml).unwrap();
        assert!(r.constituents[0].phase.is_nan());
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));

        let mut r = record();
        r.constituents[0].speed = f64::INFINITY;
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));

        let mut r = record();
        r.constituents[0].args[2] = f64::NAN;
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));

        let toml = STATION_TOML.replace("value = 5.0", "value = inf");
        let r = StationRecord::from_toml_str(&toml).unwrap();
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));

        let mut r = record();
        r.kind = StationKind::SimpleOffsetSubordinate {
            offsets: OffsetsRecord {
                level_add: f64::NAN,
                ..OffsetsRecord::default()
            },
        };
        assert!(matches!(
            r.into_station(&Settings::default()),
            Err(TideError::MalformedHarmonics(_))
        ));
    }

    #[test]
    fn current_station_ignores_length_preference() {
        let mut r = record();
        r.units = "knots".into();
        r.datum = DatumRecord::default();
        let mut settings = Settings::default();
        settings.set("u", "ft").unwrap();
        settings.set("ml", "0.5").unwrap();
        let station = r.into_station(&settings).unwrap();
        assert!(station.is_current());
        assert_eq!(station.predict_units(), Units::Knots);
        assert_eq!(station.mark_level(), Some(PredictionValue::new(Units::Knots, 0.5)));
    }

    #[test]
    fn in_memory_source_looks_up_by_name() {
        let source: InMemoryHarmonics = [record()].into_iter().collect();
        assert_eq!(source.len(), 1);
        assert_eq!(source.load_station("Example Harbor").unwrap(), record());
        assert!(matches!(
            source.load_station("Nowhere"),
            Err(TideError::StationNotFound(name)) if name == "Nowhere"
        ));
    }
}
