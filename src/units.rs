//! # Prediction Units
//!
//! The closed set of physical units a prediction can carry. Lengths (feet,
//! meters) belong to tide stations, velocities (knots) to current stations.
//! Knots squared only appears inside hydraulic current stations, whose
//! harmonic sums are squared velocities; it is square-rooted back to knots
//! before anything leaves the engine.
//!
//! `Zulu` is the unit of a value that is exactly zero and has not been
//! attached to any unit yet. It can combine with anything. It is not a null:
//! "no value at all" is `Option::None` at the call site.

use crate::error::TideError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Units {
    Feet,
    Meters,
    Knots,
    KnotsSquared,
    Zulu,
}

impl Units {
    /// Units a user may name. Zulu is internal only.
    pub const NAMED: [Units; 4] = [
        Units::Feet,
        Units::Meters,
        Units::Knots,
        Units::KnotsSquared,
    ];

    /// Abbreviated name, e.g. `"ft"`.
    pub fn short_name(self) -> &'static str {
        match self {
            Units::Feet => "ft",
            Units::Meters => "m",
            Units::Knots => "kt",
            Units::KnotsSquared => "kt^2",
            Units::Zulu => panic!("zulu units have no name"),
        }
    }

    /// Full name, e.g. `"feet"`.
    pub fn long_name(self) -> &'static str {
        match self {
            Units::Feet => "feet",
            Units::Meters => "meters",
            Units::Knots => "knots",
            Units::KnotsSquared => "knots^2",
            Units::Zulu => panic!("zulu units have no name"),
        }
    }

    /// Parse either the long or the short name of a unit.
    pub fn parse(text: &str) -> Result<Units, TideError> {
        let text = text.trim();
        Self::NAMED
            .iter()
            .copied()
            .find(|u| text == u.long_name() || text == u.short_name())
            .ok_or_else(|| TideError::UnrecognizedUnits(text.to_string()))
    }

    /// True for velocity units (knots, knots squared).
    pub fn is_current(self) -> bool {
        assert!(self != Units::Zulu, "zulu units are neither length nor velocity");
        matches!(self, Units::Knots | Units::KnotsSquared)
    }

    /// True only for knots squared.
    pub fn is_hydraulic_current(self) -> bool {
        assert!(self != Units::Zulu, "zulu units are neither length nor velocity");
        self == Units::KnotsSquared
    }

    /// Knots squared flattens to knots; everything else is unchanged.
    pub fn flatten(self) -> Units {
        assert!(self != Units::Zulu, "zulu units cannot be flattened");
        match self {
            Units::KnotsSquared => Units::Knots,
            other => other,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Zulu => f.write_str("zulu"),
            other => f.write_str(other.long_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_long_and_short_names() {
        assert_eq!(Units::parse("ft").unwrap(), Units::Feet);
        assert_eq!(Units::parse("meters").unwrap(), Units::Meters);
        assert_eq!(Units::parse(" kt ").unwrap(), Units::Knots);
        assert_eq!(Units::parse("knots^2").unwrap(), Units::KnotsSquared);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = Units::parse("furlongs").unwrap_err();
        assert!(matches!(err, TideError::UnrecognizedUnits(ref s) if s == "furlongs"));
        assert!(Units::parse("zulu").is_err());
    }

    #[test]
    fn flatten_only_touches_knots_squared() {
        assert_eq!(Units::KnotsSquared.flatten(), Units::Knots);
        assert_eq!(Units::Knots.flatten(), Units::Knots);
        assert_eq!(Units::Feet.flatten(), Units::Feet);
        assert!(Units::KnotsSquared.is_hydraulic_current());
        assert!(!Units::Knots.is_hydraulic_current());
        assert!(Units::Knots.is_current());
        assert!(!Units::Meters.is_current());
    }

    #[test]
    #[should_panic]
    fn zulu_is_not_classifiable() {
        let _ = Units::Zulu.is_current();
    }
}
