//! # Text Output
//!
//! The numeric-to-text contract for levels and the one-line renderings of a
//! single event. Layout beyond one line (tables, calendars, graphs) is
//! somebody else's job.
//!
//! ## Levels
//!
//! - [`print_value`]: sign column, width 6, long unit name (`  4.91 feet`).
//! - [`print_value_np`]: no padding, short unit name (`4.91 ft`).
//!
//! Both honour the configured number of decimal digits and can omit the
//! unit name.
//!
//! ## Event lines
//!
//! | mode        | text                          | CSV                                |
//! |-------------|-------------------------------|------------------------------------|
//! | plain       | `date time  level  desc`      | `name,date,time,level,desc`        |
//! | raw         | `unix level`                  | `name,unix,level`                  |
//! | medium rare | `date time level`             | `name,date,time,level`             |
//!
//! Commas inside names and descriptions become `|` in CSV output.

use crate::config::Settings;
use crate::event::{EventKind, TideEvent};
use crate::time::Timestamp;
use crate::value::PredictionValue;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const CSV_REPCHAR: char = '|';
const LEVEL_WIDTH: usize = 6;

/// What an output line carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Tide events with descriptions.
    #[default]
    #[serde(rename = "p")]
    Plain,
    /// Raw readings as unix time and bare number.
    #[serde(rename = "r")]
    Raw,
    /// Raw readings with human-readable time.
    #[serde(rename = "m")]
    MediumRare,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "p" => Ok(Mode::Plain),
            "r" => Ok(Mode::Raw),
            "m" => Ok(Mode::MediumRare),
            other => Err(format!("unknown mode '{other}' (expected p, r or m)")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Form {
    #[default]
    #[serde(rename = "t")]
    Text,
    #[serde(rename = "c")]
    Csv,
}

impl FromStr for Form {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "t" => Ok(Form::Text),
            "c" => Ok(Form::Csv),
            other => Err(format!("unknown format '{other}' (expected t or c)")),
        }
    }
}

/// How levels are rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueFormat {
    pub decimal_digits: usize,
    pub omit_units: bool,
}

impl Default for ValueFormat {
    fn default() -> Self {
        ValueFormat {
            decimal_digits: 2,
            omit_units: false,
        }
    }
}

impl From<&Settings> for ValueFormat {
    fn from(settings: &Settings) -> Self {
        ValueFormat {
            decimal_digits: settings.decimal_digits as usize,
            omit_units: settings.omit_units,
        }
    }
}

/// Like C's `% 6.2f`: a space where a minus sign would go.
fn signed_fixed(value: f64, digits: usize) -> String {
    let text = format!("{value:.digits$}");
    if text.starts_with('-') {
        text
    } else {
        format!(" {text}")
    }
}

/// Padded level with long unit name, for aligned text.
pub fn print_value(pv: PredictionValue, format: &ValueFormat) -> String {
    let number = format!(
        "{:>width$}",
        signed_fixed(pv.val(), format.decimal_digits),
        width = LEVEL_WIDTH
    );
    if format.omit_units || pv.is_zulu() {
        number
    } else {
        format!("{number} {}", pv.units().long_name())
    }
}

/// Unpadded level with short unit name.
pub fn print_value_np(pv: PredictionValue, format: &ValueFormat) -> String {
    let number = format!("{:.*}", format.decimal_digits, pv.val());
    if format.omit_units || pv.is_zulu() {
        number
    } else {
        format!("{number} {}", pv.units().short_name())
    }
}

fn print_date(t: Timestamp) -> String {
    t.datetime().format("%Y-%m-%d").to_string()
}

fn print_time(t: Timestamp) -> String {
    t.datetime().format("%H:%M UTC").to_string()
}

fn csv_escape(text: &str) -> String {
    text.replace(',', &CSV_REPCHAR.to_string())
}

/// One line for `event` at `station_name`. Raw readings have no
/// description, so plain mode prints them without one.
pub fn format_event(
    event: &TideEvent,
    station_name: &str,
    mode: Mode,
    form: Form,
    format: &ValueFormat,
) -> String {
    let t = event.time;
    let description = match event.kind {
        EventKind::RawReading => "",
        _ => event.long_description(),
    };
    match (mode, form) {
        (Mode::Raw, Form::Text) => format!("{} {:.6}", t.unix(), event.level.val()),
        (Mode::Raw, Form::Csv) => format!(
            "{},{},{:.6}",
            csv_escape(station_name),
            t.unix(),
            event.level.val()
        ),
        (Mode::MediumRare, Form::Text) => {
            format!("{} {} {:.6}", print_date(t), print_time(t), event.level.val())
        }
        (Mode::MediumRare, Form::Csv) => format!(
            "{},{},{},{:.6}",
            csv_escape(station_name),
            print_date(t),
            print_time(t),
            event.level.val()
        ),
        (Mode::Plain, Form::Text) => format!(
            "{} {} {}  {}",
            print_date(t),
            print_time(t),
            print_value(event.level, format),
            description
        )
        .trim_end()
        .to_string(),
        (Mode::Plain, Form::Csv) => format!(
            "{},{},{},{},{}",
            csv_escape(station_name),
            print_date(t),
            print_time(t),
            print_value_np(event.level, format),
            csv_escape(description)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Units;

    fn event(kind: EventKind, level: PredictionValue, is_current: bool) -> TideEvent {
        TideEvent {
            // 2024-01-02 03:04:05 UTC
            time: Timestamp::from_unix(1_704_164_645).unwrap(),
            kind,
            level,
            is_current,
        }
    }

    #[test]
    fn values_have_sign_column_and_units() {
        let f = ValueFormat::default();
        assert_eq!(print_value(PredictionValue::new(Units::Feet, 4.912), &f), "  4.91 feet");
        assert_eq!(print_value(PredictionValue::new(Units::Meters, -0.5), &f), " -0.50 meters");
        assert_eq!(print_value(PredictionValue::new(Units::Feet, 12.0), &f), " 12.00 feet");
        assert_eq!(print_value_np(PredictionValue::new(Units::Knots, -1.234), &f), "-1.23 kt");
    }

    #[test]
    fn digits_and_omitted_units() {
        let f = ValueFormat {
            decimal_digits: 0,
            omit_units: true,
        };
        assert_eq!(print_value(PredictionValue::new(Units::Feet, 4.6), &f), "     5");
        assert_eq!(print_value_np(PredictionValue::new(Units::Feet, 4.6), &f), "5");
        let f = ValueFormat {
            decimal_digits: 3,
            omit_units: false,
        };
        assert_eq!(print_value_np(PredictionValue::new(Units::Meters, 1.0), &f), "1.000 m");
    }

    #[test]
    fn plain_lines() {
        let f = ValueFormat::default();
        let high = event(EventKind::Max, PredictionValue::new(Units::Feet, 8.3), false);
        assert_eq!(
            format_event(&high, "Boston, MA", Mode::Plain, Form::Text, &f),
            "2024-01-02 03:04 UTC   8.30 feet  High Tide"
        );
        let slack = event(EventKind::SlackRise, PredictionValue::new(Units::Knots, 0.0), true);
        assert_eq!(
            format_event(&slack, "Race, The", Mode::Plain, Form::Csv, &f),
            "Race| The,2024-01-02,03:04 UTC,0.00 kt,Slack| Flood Begins"
        );
    }

    #[test]
    fn raw_and_medium_rare_lines() {
        let f = ValueFormat::default();
        let reading = event(EventKind::RawReading, PredictionValue::new(Units::Meters, 1.25), false);
        assert_eq!(
            format_event(&reading, "X", Mode::Raw, Form::Text, &f),
            "1704164645 1.250000"
        );
        assert_eq!(
            format_event(&reading, "A, B", Mode::Raw, Form::Csv, &f),
            "A| B,1704164645,1.250000"
        );
        assert_eq!(
            format_event(&reading, "X", Mode::MediumRare, Form::Text, &f),
            "2024-01-02 03:04 UTC 1.250000"
        );
        assert_eq!(
            format_event(&reading, "X", Mode::Plain, Form::Text, &f),
            "2024-01-02 03:04 UTC   1.25 meters"
        );
    }

    #[test]
    fn mode_names() {
        assert_eq!("m".parse::<Mode>(), Ok(Mode::MediumRare));
        assert_eq!("c".parse::<Form>(), Ok(Form::Csv));
        assert!("x".parse::<Mode>().is_err());
    }
}
