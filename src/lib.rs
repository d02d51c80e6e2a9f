//! # Tide Engine Core Library
//!
//! Harmonic tide prediction: the level of the water (or the speed of a tidal
//! current) at any instant is a sum of cosines, one per astronomical
//! constituent, corrected year by year with node factors and equilibrium
//! arguments. On top of that sum this crate finds the events people care
//! about: high and low water, slack water, and crossings of a chosen level.
//!
//! ## Design Philosophy
//!
//! ### Units Travel With Values
//! - **No bare floats for levels**: every level is a [`PredictionValue`] tagged
//!   with [`Units`]; feet and meters convert linearly, knots and knots squared
//!   through a signed square
//! - **Zulu zero**: an untagged zero combines with anything, so sums can start
//!   from nothing
//! - **Mixing units is a bug**: adding feet to knots panics instead of
//!   producing a number
//!
//! ### Smooth Across New Year
//! Node factors and equilibrium arguments change at every New Year, so the
//! raw sum jumps there. Within an hour of each boundary the two years'
//! predictions are blended with a smooth weight, which keeps every
//! derivative the root finder uses continuous.
//!
//! ### Errors
//! - **Bad data** (years outside the tables, malformed records, unknown
//!   units) returns [`TideError`]
//! - **Bad calls** (mixed units, brackets that do not straddle a root) panic
//! - **Harmless surprises** are logged with `tracing` and skipped
//!
//! ## Data Flow
//! 1. **Load**: a [`StationRecord`] comes from TOML/JSON or any [`HarmonicsSource`]
//! 2. **Build**: [`StationRecord::into_station`] applies offsets and [`Settings`]
//! 3. **Predict**: [`Station::predict_tide_events`] fills a [`TideEventsOrganizer`]
//! 4. **Print**: [`format::format_event`] renders one line per event
//!
//! ## Example
//!
//! ```no_run
//! use tide_engine_lib::{EventFilter, Settings, StationRecord, Timestamp, TideEventsOrganizer};
//! use tide_engine_lib::time::Interval;
//!
//! # fn main() -> Result<(), tide_engine_lib::TideError> {
//! let settings = Settings::default();
//! let mut station = StationRecord::load_from_path("harbor.toml")?.into_station(&settings)?;
//! let start = Timestamp::now();
//! let mut events = TideEventsOrganizer::new();
//! station.predict_tide_events(start, start + Interval::from_days(2), &mut events, EventFilter::All)?;
//! for event in events.iter() {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod config;
pub mod constituent;
pub mod constituent_set;
pub mod error;
pub mod event;
pub mod format;
pub mod harmonics;
pub mod offsets;
pub mod station;
pub mod time;
pub mod units;
pub mod value;

#[cfg(test)]
mod test_support;

pub use config::Settings;
pub use constituent::Constituent;
pub use constituent_set::ConstituentSet;
pub use error::TideError;
pub use event::{EventFilter, EventKind, TideEvent, TideEventsOrganizer};
pub use harmonics::{HarmonicsSource, InMemoryHarmonics, StationRecord};
pub use offsets::SimpleOffsets;
pub use station::{Direction, Station};
pub use time::{Interval, Timestamp, Year};
pub use units::Units;
pub use value::{Amplitude, PredictionValue};
