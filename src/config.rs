//! # Prediction Settings
//!
//! User-facing knobs for a prediction run, loaded from a TOML file and passed
//! explicitly to station construction. Every field is validated before it
//! reaches the engine, so numbers the engine sees are always in range.
//!
//! Each setting also has a short switch name, so front ends can assign
//! settings from text with [`Settings::set`]:
//!
//! | switch | field                   | values                         |
//! |--------|-------------------------|--------------------------------|
//! | `u`    | `units`                 | `ft`, `m`, `x` (no preference) |
//! | `ou`   | `omit_units`            | `y` / `n`                      |
//! | `ml`   | `mark_level`            | number, or `none`              |
//! | `pi`   | `predict_interval_days` | 1 through 36500                |
//! | `s`    | `step_minutes`          | minutes, or `HH:MM`            |
//! | `dd`   | `decimal_digits`        | 0 through 6                    |
//! | `m`    | `mode`                  | `p`, `r`, `m`                  |
//! | `f`    | `form`                  | `t`, `c`                       |
//! | `ef`   | `event_filter`          | `all`, `known`, `maxmin`       |

use crate::error::TideError;
use crate::event::EventFilter;
use crate::format::{Form, Mode};
use crate::time::Interval;
use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const MAX_DECIMAL_DIGITS: u8 = 6;
const MAX_PREDICT_INTERVAL_DAYS: u32 = 36_500;

/// Preferred units of length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitsPreference {
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "m")]
    Meters,
    /// Whatever the station data uses.
    #[default]
    #[serde(rename = "x")]
    Native,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub units: UnitsPreference,
    /// Print levels without unit names.
    pub omit_units: bool,
    /// Mark level in the station's prediction units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_level: Option<f64>,
    pub predict_interval_days: u32,
    /// Raw reading spacing.
    pub step_minutes: u32,
    pub decimal_digits: u8,
    pub mode: Mode,
    pub form: Form,
    pub event_filter: EventFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            units: UnitsPreference::Native,
            omit_units: false,
            mark_level: None,
            predict_interval_days: 4,
            step_minutes: 60,
            decimal_digits: 2,
            mode: Mode::Plain,
            form: Form::Text,
            event_filter: EventFilter::All,
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

/// `90` or `1:30`.
fn parse_minutes(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.split_once(':') {
        Some((h, m)) => {
            let h: u32 = h.parse().ok()?;
            let m: u32 = m.parse().ok()?;
            if m >= 60 {
                return None;
            }
            h.checked_mul(60)?.checked_add(m)
        }
        None => text.parse().ok(),
    }
}

impl Settings {
    /// Load `tide-settings.toml` from the working directory.
    pub fn load() -> Self {
        Self::load_from_path("tide-settings.toml")
    }

    /// Load settings from `path`, falling back to defaults if the file is
    /// missing, unparseable or out of range.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "loaded settings");
                    settings
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no settings file found, using defaults");
                Self::default()
            }
        }
    }

    /// Parse and validate.
    pub fn from_toml_str(contents: &str) -> Result<Self, TideError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), TideError> {
        if self.predict_interval_days == 0 || self.predict_interval_days > MAX_PREDICT_INTERVAL_DAYS {
            return Err(TideError::Config(format!(
                "predict interval must be 1 through {MAX_PREDICT_INTERVAL_DAYS} days, got {}",
                self.predict_interval_days
            )));
        }
        if self.step_minutes == 0 {
            return Err(TideError::Config("step must be at least one minute".into()));
        }
        if self.decimal_digits > MAX_DECIMAL_DIGITS {
            return Err(TideError::Config(format!(
                "decimal digits must be 0 through {MAX_DECIMAL_DIGITS}, got {}",
                self.decimal_digits
            )));
        }
        if let Some(ml) = self.mark_level {
            if !ml.is_finite() {
                return Err(TideError::Config(format!("mark level {ml} is not a number")));
            }
        }
        Ok(())
    }

    /// Assign one setting from text by its switch name. Rejected input
    /// leaves the settings unchanged.
    pub fn set(&mut self, switch: &str, text: &str) -> Result<(), TideError> {
        let bad = |what: &str| TideError::Config(format!("bad value '{text}' for -{switch}: {what}"));
        let mut next = self.clone();
        match switch {
            "u" => {
                next.units = match text.trim() {
                    "ft" => UnitsPreference::Feet,
                    "m" => UnitsPreference::Meters,
                    "x" => UnitsPreference::Native,
                    _ => return Err(bad("expected ft, m or x")),
                }
            }
            "ou" => next.omit_units = parse_bool(text).ok_or_else(|| bad("expected y or n"))?,
            "ml" => {
                next.mark_level = match text.trim() {
                    "none" | "" => None,
                    t => Some(t.parse().map_err(|_| bad("expected a number"))?),
                }
            }
            "pi" => {
                next.predict_interval_days = text.trim().parse().map_err(|_| bad("expected days"))?
            }
            "s" => {
                next.step_minutes = parse_minutes(text).ok_or_else(|| bad("expected minutes or HH:MM"))?
            }
            "dd" => next.decimal_digits = text.trim().parse().map_err(|_| bad("expected digits"))?,
            "m" => next.mode = text.parse().map_err(|e: String| bad(&e))?,
            "f" => next.form = text.parse().map_err(|e: String| bad(&e))?,
            "ef" => next.event_filter = text.parse().map_err(|e: String| bad(&e))?,
            other => return Err(TideError::Config(format!("unknown setting -{other}"))),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn preferred_units(&self) -> Option<Units> {
        match self.units {
            UnitsPreference::Feet => Some(Units::Feet),
            UnitsPreference::Meters => Some(Units::Meters),
            UnitsPreference::Native => None,
        }
    }

    pub fn step(&self) -> Interval {
        Interval::from_minutes(i64::from(self.step_minutes))
    }

    pub fn predict_interval(&self) -> Interval {
        Interval::from_days(i64::from(self.predict_interval_days))
    }

    /// Write the settings as TOML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TideError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| TideError::Config(e.to_string()))?;
        fs::write(&path, contents)?;
        tracing::info!(path = %path.as_ref().display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.predict_interval_days, 4);
        assert_eq!(settings.step(), Interval::from_hours(1));
        assert_eq!(settings.decimal_digits, 2);
        assert_eq!(settings.mode, Mode::Plain);
        assert_eq!(settings.preferred_units(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = Settings::default();
        settings.mark_level = Some(2.5);
        settings.units = UnitsPreference::Feet;
        let toml_str = toml::to_string(&settings).unwrap();
        let parsed = Settings::from_toml_str(&toml_str).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed = Settings::from_toml_str("units = \"m\"\nmode = \"r\"\n").unwrap();
        assert_eq!(parsed.preferred_units(), Some(Units::Meters));
        assert_eq!(parsed.mode, Mode::Raw);
        assert_eq!(parsed.step_minutes, 60);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(matches!(
            Settings::from_toml_str("decimal_digits = 9"),
            Err(TideError::Config(_))
        ));
        assert!(Settings::from_toml_str("step_minutes = 0").is_err());
        assert!(Settings::from_toml_str("predict_interval_days = 36500").is_ok());
        assert!(matches!(
            Settings::from_toml_str("predict_interval_days = 36501"),
            Err(TideError::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("units = \"furlongs\""),
            Err(TideError::Toml(_))
        ));
    }

    #[test]
    fn test_set_by_switch() {
        let mut settings = Settings::default();
        settings.set("u", "ft").unwrap();
        settings.set("ml", "3.5").unwrap();
        settings.set("s", "0:30").unwrap();
        settings.set("ou", "y").unwrap();
        settings.set("ef", "maxmin").unwrap();
        assert_eq!(settings.preferred_units(), Some(Units::Feet));
        assert_eq!(settings.mark_level, Some(3.5));
        assert_eq!(settings.step(), Interval::from_minutes(30));
        assert!(settings.omit_units);
        assert_eq!(settings.event_filter, EventFilter::MaxMin);
        settings.set("ml", "none").unwrap();
        assert_eq!(settings.mark_level, None);
    }

    #[test]
    fn test_rejected_switch_leaves_settings_alone() {
        let mut settings = Settings::default();
        assert!(settings.set("dd", "7").is_err());
        assert!(settings.set("pi", "-1").is_err());
        assert!(settings.set("pi", "4294967295").is_err());
        assert!(settings.set("s", "1:75").is_err());
        assert!(settings.set("zz", "1").is_err());
        assert!(settings.set("u", "kt").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let settings = Settings::load_from_path("/nonexistent/path");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load_file() {
        let file = NamedTempFile::new().unwrap();
        let mut settings = Settings::default();
        settings.set("m", "m").unwrap();
        settings.set("dd", "3").unwrap();
        settings.save_to_path(file.path()).unwrap();
        assert_eq!(Settings::load_from_path(file.path()), settings);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "decimal_digits = \"lots\"").unwrap();
        assert_eq!(Settings::load_from_path(file.path()), Settings::default());
    }
}
