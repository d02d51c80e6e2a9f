//! # Engine Errors
//!
//! Recoverable failures of the prediction engine. Anything in here aborts the
//! current prediction request only; the engine keeps no error state and the
//! same `Station` can be retried with corrected inputs.
//!
//! Caller bugs (mixed-unit arithmetic, a bracket that does not straddle a
//! root, velocity units used as preferred length units) are not represented
//! here. Those panic at the point of misuse.

use crate::time::Year;
use std::io;
use thiserror::Error;

/// Errors that can occur while loading harmonics or predicting tides.
#[derive(Error, Debug)]
pub enum TideError {
    /// The harmonics data has no node factors or equilibrium arguments for
    /// the requested year.
    #[error("year {year} is outside the range supported by the harmonics data ({first} through {last})")]
    YearNotInTable { year: Year, first: Year, last: Year },

    /// An instant in or after `year` cannot be represented as a timestamp.
    #[error("timestamp out of range after the start of year {year}")]
    TimestampOverflow { year: Year },

    /// Units text did not match any known unit name.
    #[error("unrecognized units: {0}")]
    UnrecognizedUnits(String),

    /// Constituent or station records are internally inconsistent.
    #[error("malformed harmonics data: {0}")]
    MalformedHarmonics(String),

    /// The harmonics source has no station by that name.
    #[error("station not found: {0}")]
    StationNotFound(String),

    /// Every constituent has zero speed, so the tide has no extrema to find.
    #[error("tide signal has no time dependence")]
    FlatSignal,

    /// A setting failed validation.
    #[error("invalid setting: {0}")]
    Config(String),

    /// Reading or writing a settings or station file failed.
    #[error("file IO: {0}")]
    Io(#[from] io::Error),

    /// A settings or station file is not valid TOML for the expected schema.
    #[error("TOML parse: {0}")]
    Toml(#[from] toml::de::Error),

    /// A station file is not valid JSON for the expected schema.
    #[error("JSON parse: {0}")]
    Json(#[from] serde_json::Error),
}
