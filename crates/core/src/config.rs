// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-event configuration parsed from the calendar event description.
//!
//! The description may carry a YAML document with a `config` mapping:
//!
//! ```yaml
//! config:
//!   max: 8
//!   min: 2
//!   start_poll_at: "11:00"
//!   stop_poll_at: "14:00"
//! ```
//!
//! Poll anchors are either absolute RFC 3339 instants or wall-clock times
//! composed with the event's date in the event's offset. Unknown keys are
//! rejected.

use chrono::{DateTime, FixedOffset, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::TeaveError;

pub const DEFAULT_MAX_PARTICIPANTS: usize = 100;
pub const DEFAULT_MIN_PARTICIPANTS: usize = 1;

/// A poll anchor: an absolute instant, or a wall-clock time resolved
/// against the event's own date and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAnchor {
    At(DateTime<FixedOffset>),
    WallClock(NaiveTime),
}

impl FromStr for PollAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(PollAnchor::At(dt));
        }
        if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
            return Ok(PollAnchor::WallClock(t));
        }
        if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
            return Ok(PollAnchor::WallClock(t));
        }
        Err(format!("expected an RFC 3339 datetime or HH:MM[:SS] wall time, got '{s}'"))
    }
}

impl fmt::Display for PollAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollAnchor::At(dt) => write!(f, "{}", dt.to_rfc3339()),
            PollAnchor::WallClock(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl Serialize for PollAnchor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PollAnchor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Per-event knobs from the calendar description's `config` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeaventConfig {
    /// Hard capacity; participants beyond it form the reserve.
    #[serde(default = "default_max")]
    pub max: usize,

    /// Readiness threshold checked when the poll closes.
    #[serde(default = "default_min")]
    pub min: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_poll_at: Option<PollAnchor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_poll_at: Option<PollAnchor>,
}

fn default_max() -> usize {
    DEFAULT_MAX_PARTICIPANTS
}

fn default_min() -> usize {
    DEFAULT_MIN_PARTICIPANTS
}

impl Default for TeaventConfig {
    fn default() -> Self {
        Self { max: default_max(), min: default_min(), start_poll_at: None, stop_poll_at: None }
    }
}

impl TeaventConfig {
    /// Extract the config block from a calendar event description.
    ///
    /// A description that is valid YAML but not a mapping with a `config`
    /// key yields the defaults; malformed YAML or a bad block is a parse
    /// error.
    pub fn from_description(description: &str) -> Result<TeaventConfig, TeaveError> {
        let parsed: serde_yaml::Value = serde_yaml::from_str(description)
            .map_err(|e| TeaveError::EventDescriptionParsing { message: e.to_string() })?;

        let Some(block) = parsed.get("config") else {
            return Ok(TeaventConfig::default());
        };

        serde_yaml::from_value(block.clone())
            .map_err(|e| TeaveError::EventDescriptionParsing { message: e.to_string() })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
