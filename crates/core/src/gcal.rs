// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar payload mapping.
//!
//! The ingestion adapter hands over raw calendar items; this module turns
//! them into [`Teavent`]s. The description is NBSP-normalized before the
//! config block is parsed, and `cal_id` is derived from the organizer
//! email's local part.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::TeaventConfig;
use crate::errors::TeaveError;
use crate::teavent::{State, Teavent};

pub const CAL_ID_SUFFIX: &str = "@group.calendar.google.com";

/// Nested `{"dateTime": ...}` wrapper used by calendar payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDateTime {
    pub date_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub email: String,
}

/// One event item as delivered by the calendar source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: CalendarDateTime,
    pub end: CalendarDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start_time: Option<CalendarDateTime>,
    pub organizer: Organizer,
}

impl CalendarItem {
    pub fn from_json(json: &str) -> Result<CalendarItem, TeaveError> {
        serde_json::from_str(json).map_err(|e| TeaveError::CalendarPayload { message: e.to_string() })
    }

    /// Build a fresh teavent from this calendar item.
    pub fn into_teavent(self, communication_ids: Vec<String>) -> Result<Teavent, TeaveError> {
        let description = self.description.replace('\u{a0}', " ");
        let config = TeaventConfig::from_description(&description)?;

        Ok(Teavent {
            id: self.id,
            cal_id: cal_id_for(&self.organizer.email),
            summary: self.summary,
            description,
            location: self.location,
            start: self.start.date_time,
            end: self.end.date_time,
            rrule: self.recurrence.unwrap_or_default(),
            recurring_event_id: self.recurring_event_id,
            original_start_time: self.original_start_time.map(|t| t.date_time),
            config,
            communication_ids,
            participant_ids: Vec::new(),
            latees: Vec::new(),
            state: State::Created,
            effective_max: None,
        })
    }
}

/// `cal_id` is the organizer email's local part plus the calendar suffix.
pub fn cal_id_for(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    format!("{local}{CAL_ID_SUFFIX}")
}

#[cfg(test)]
#[path = "gcal_tests.rs"]
mod tests;
