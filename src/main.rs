//! # Tide Predictor Entry Point
//!
//! Prints tide events (or raw readings) for one station, one line each.
//!
//! ```text
//! tide-predict <station.toml|station.json> [settings.toml]
//! ```
//!
//! Settings default to `tide-settings.toml` in the working directory and fall
//! back to built-in defaults. Predictions start now and cover the configured
//! number of days. Log output goes to stderr and is filtered with `RUST_LOG`.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use std::env;
use tide_engine_lib::format::{format_event, Mode, ValueFormat};
use tide_engine_lib::{Settings, Station, StationRecord, Timestamp, TideError, TideEventsOrganizer};
use tracing_subscriber::{fmt, EnvFilter};

/// Render every event or reading in `[start, start + predict interval)`.
pub fn render_events(
    station: &mut Station,
    start: Timestamp,
    settings: &Settings,
) -> Result<Vec<String>, TideError> {
    let end = start
        .checked_add(settings.predict_interval())
        .ok_or(TideError::TimestampOverflow { year: start.year() })?;
    let mut organizer = TideEventsOrganizer::new();
    match settings.mode {
        Mode::Plain => {
            station.predict_tide_events(start, end, &mut organizer, settings.event_filter)?
        }
        Mode::Raw | Mode::MediumRare => station.predict_raw_events(start, end, &mut organizer)?,
    }
    let value_format = ValueFormat::from(settings);
    Ok(organizer
        .iter()
        .map(|event| format_event(event, &station.name, settings.mode, settings.form, &value_format))
        .collect())
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(station_path) = args.first() else {
        anyhow::bail!("usage: tide-predict <station.toml|station.json> [settings.toml]");
    };
    let settings = match args.get(1) {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    };

    let record = StationRecord::load_from_path(station_path)
        .with_context(|| format!("loading station from {station_path}"))?;
    let mut station = record
        .into_station(&settings)
        .with_context(|| format!("building station {}", record.name))?;

    let lines = render_events(&mut station, Timestamp::now(), &settings)
        .with_context(|| format!("predicting tides for {}", station.name))?;
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
