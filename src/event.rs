//! # Tide Events
//!
//! What the predictor produces: an instant, what happened at it, and the
//! level at that instant. Events are collected into a
//! [`TideEventsOrganizer`], a time-ordered map that drops near-duplicates so
//! overlapping prediction windows can be merged freely.
//!
//! ## Descriptions
//!
//! Labels depend only on the event kind, whether the station predicts
//! currents, and the sign of the level. A current maximum with a negative
//! level is the weakest ebb, not a flood:
//!
//! | kind | tide station | current, level ≥ 0 | current, level < 0 |
//! |------|--------------|--------------------|--------------------|
//! | max  | High Tide    | Max Flood          | Min Ebb            |
//! | min  | Low Tide     | Min Flood (> 0)    | Max Ebb (≤ 0)      |

use crate::time::{Interval, Timestamp, EVENT_SAFETY_MARGIN};
use crate::value::PredictionValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Max,
    Min,
    SlackRise,
    SlackFall,
    MarkRise,
    MarkFall,
    RawReading,
}

/// Which events a tide-event prediction reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventFilter {
    /// Extrema, slacks and mark crossings.
    #[default]
    #[serde(rename = "all")]
    All,
    /// Extrema and slacks; the mark level is ignored.
    #[serde(rename = "known")]
    KnownTideEvents,
    /// Extrema only.
    #[serde(rename = "maxmin")]
    MaxMin,
}

impl FromStr for EventFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(EventFilter::All),
            "known" => Ok(EventFilter::KnownTideEvents),
            "maxmin" => Ok(EventFilter::MaxMin),
            other => Err(format!("unknown event filter '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    pub time: Timestamp,
    pub kind: EventKind,
    /// Datum included; knots, never knots squared.
    pub level: PredictionValue,
    pub is_current: bool,
}

impl TideEvent {
    pub fn is_max_min_event(&self) -> bool {
        matches!(self.kind, EventKind::Max | EventKind::Min)
    }

    /// A current extremum on the "wrong" side of zero: a maximum during the
    /// ebb or a minimum during the flood.
    pub fn is_min_current_event(&self) -> bool {
        match self.kind {
            EventKind::Max => self.is_current && self.level.val() < 0.0,
            EventKind::Min => self.is_current && self.level.val() > 0.0,
            _ => false,
        }
    }

    pub fn long_description(&self) -> &'static str {
        let level = self.level.val();
        match self.kind {
            EventKind::Max if self.is_current => {
                if level >= 0.0 {
                    "Max Flood"
                } else {
                    "Min Ebb"
                }
            }
            EventKind::Max => "High Tide",
            EventKind::Min if self.is_current => {
                if level <= 0.0 {
                    "Max Ebb"
                } else {
                    "Min Flood"
                }
            }
            EventKind::Min => "Low Tide",
            EventKind::SlackRise => "Slack, Flood Begins",
            EventKind::SlackFall => "Slack, Ebb Begins",
            EventKind::MarkRise if self.is_current => {
                if level < 0.0 {
                    "Mark, Ebb Decreasing"
                } else if level > 0.0 {
                    "Mark, Flood Increasing"
                } else {
                    "Mark, Flood Begins"
                }
            }
            EventKind::MarkRise => "Mark Rising",
            EventKind::MarkFall if self.is_current => {
                if level < 0.0 {
                    "Mark, Ebb Increasing"
                } else if level > 0.0 {
                    "Mark, Flood Decreasing"
                } else {
                    "Mark, Ebb Begins"
                }
            }
            EventKind::MarkFall => "Mark Falling",
            EventKind::RawReading => panic!("raw readings have no description"),
        }
    }

    /// Five characters at most. Only slacks and marks have one.
    pub fn short_description(&self) -> &'static str {
        match self.kind {
            EventKind::SlackRise | EventKind::SlackFall => "Slack",
            EventKind::MarkRise | EventKind::MarkFall => "Mark",
            other => panic!("no short description for {other:?}"),
        }
    }
}

impl fmt::Display for TideEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::RawReading => write!(f, "{} {}", self.time, self.level),
            _ => write!(f, "{} {}  {}", self.time, self.level, self.long_description()),
        }
    }
}

/// Time-ordered event collection.
///
/// An added event is dropped when an event of the same kind already lies
/// strictly less than [`EVENT_SAFETY_MARGIN`] away. The first one stored
/// wins. The rule is not transitive, so insertion order can matter for
/// pathological clusters; real tide events are hours apart.
#[derive(Clone, Debug, Default)]
pub struct TideEventsOrganizer {
    events: BTreeMap<Timestamp, Vec<TideEvent>>,
    len: usize,
}

impl TideEventsOrganizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the event was stored.
    pub fn add(&mut self, event: TideEvent) -> bool {
        let reach = EVENT_SAFETY_MARGIN - Interval::from_seconds(1);
        let duplicate = self
            .events
            .range((event.time - reach)..=(event.time + reach))
            .flat_map(|(_, at)| at.iter())
            .any(|e| e.kind == event.kind);
        if duplicate {
            tracing::trace!(time = %event.time, kind = ?event.kind, "dropped duplicate event");
            return false;
        }
        self.events.entry(event.time).or_default().push(event);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.len = 0;
    }

    /// Events in time order; same-instant events in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TideEvent> + '_ {
        self.events.values().flat_map(|at| at.iter())
    }

    /// Events with `start <= time < end`.
    pub fn range(&self, start: Timestamp, end: Timestamp) -> impl Iterator<Item = &TideEvent> + '_ {
        self.events.range(start..end).flat_map(|(_, at)| at.iter())
    }

    pub fn first(&self) -> Option<&TideEvent> {
        self.events.values().next().and_then(|at| at.first())
    }

    pub fn last(&self) -> Option<&TideEvent> {
        self.events.values().next_back().and_then(|at| at.last())
    }

    pub fn to_vec(&self) -> Vec<TideEvent> {
        self.iter().copied().collect()
    }
}

impl Extend<TideEvent> for TideEventsOrganizer {
    fn extend<I: IntoIterator<Item = TideEvent>>(&mut self, iter: I) {
        for event in iter {
            self.add(event);
        }
    }
}
