// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Teavent record: one occurrence of a group activity with its
//! participation state.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::config::TeaventConfig;
use crate::errors::TeaveError;
use crate::recurrence;

/// Default poll window anchors relative to the event start.
pub const DEFAULT_START_POLL_DELTA_HOURS: i64 = 5;
pub const DEFAULT_STOP_POLL_DELTA_HOURS: i64 = 2;

/// Lifecycle state of a teavent. Stored on the record so a recovered
/// document seats its state machine exactly where it left off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Created,
    PollOpen,
    Planned,
    Started,
    Cancelled,
    Ended,
    Finalized,
}

impl State {
    pub fn is_final(&self) -> bool {
        matches!(self, State::Finalized)
    }
}

crate::simple_display! {
    State {
        Created => "created",
        PollOpen => "poll_open",
        Planned => "planned",
        Started => "started",
        Cancelled => "cancelled",
        Ended => "ended",
        Finalized => "finalized",
    }
}

/// A single occurrence of a group activity.
///
/// Identity attributes come from the calendar and never change; lifecycle
/// attributes (`start`/`end` for recurring series, participants, latees,
/// `state`, `effective_max`) are mutated by the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teavent {
    pub id: String,
    #[serde(default)]
    pub cal_id: String,

    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,

    /// RFC 5545 recurrence rules; empty for one-off events.
    #[serde(default)]
    pub rrule: Vec<String>,
    /// Series id, set only on exception instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start_time: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub config: TeaventConfig,

    /// Where the presenter renders updates for this teavent.
    #[serde(default)]
    pub communication_ids: Vec<String>,

    /// Ordered; the first `config.max` are active, the rest are reserve.
    #[serde(default)]
    pub participant_ids: Vec<String>,
    /// Confirmed participants who flagged themselves late after start.
    #[serde(default)]
    pub latees: Vec<String>,

    #[serde(default)]
    pub state: State,

    /// Participant count snapshot taken when the poll closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_max: Option<usize>,
}

impl Teavent {
    pub fn num_participants(&self) -> usize {
        self.participant_ids.len()
    }

    pub fn ready(&self) -> bool {
        self.num_participants() >= self.config.min
    }

    pub fn is_recurring(&self) -> bool {
        !self.rrule.is_empty()
    }

    pub fn confirmed_by(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == user_id)
    }

    /// The first `config.max` participants, in confirmation order.
    pub fn effective_participant_ids(&self) -> &[String] {
        let cut = self.config.max.min(self.participant_ids.len());
        &self.participant_ids[..cut]
    }

    /// Participants beyond `config.max`, queued but not active.
    pub fn reserve_participant_ids(&self) -> &[String] {
        let cut = self.config.max.min(self.participant_ids.len());
        &self.participant_ids[cut..]
    }

    pub fn has_reserve(&self) -> bool {
        !self.reserve_participant_ids().is_empty()
    }

    /// UTC offset the event lives in, taken from its start.
    pub fn tz(&self) -> FixedOffset {
        *self.start.offset()
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// When the registration poll opens.
    pub fn start_poll_at(&self) -> DateTime<FixedOffset> {
        match self.config.start_poll_at {
            Some(anchor) => self.resolve_anchor(anchor),
            None => self.start - TimeDelta::hours(DEFAULT_START_POLL_DELTA_HOURS),
        }
    }

    /// When the registration poll closes.
    pub fn stop_poll_at(&self) -> DateTime<FixedOffset> {
        match self.config.stop_poll_at {
            Some(anchor) => self.resolve_anchor(anchor),
            None => self.start - TimeDelta::hours(DEFAULT_STOP_POLL_DELTA_HOURS),
        }
    }

    fn resolve_anchor(&self, anchor: crate::config::PollAnchor) -> DateTime<FixedOffset> {
        match anchor {
            crate::config::PollAnchor::At(dt) => dt,
            crate::config::PollAnchor::WallClock(t) => {
                at_offset(self.start.date_naive().and_time(t), self.tz())
            }
        }
    }

    /// Move the event to `date`, preserving time-of-day, offset, and
    /// duration.
    pub fn shift_to(&mut self, date: NaiveDate) {
        let duration = self.duration();
        self.start = at_offset(date.and_time(self.start.time()), self.tz());
        self.end = self.start + duration;
        tracing::info!(teavent = %self.id, start = %self.start, "shifted teavent");
    }

    /// Advance a recurring event to its next occurrence strictly after
    /// `now`, honoring exception instances of the series.
    pub fn adjust(
        &mut self,
        now: DateTime<FixedOffset>,
        exceptions: &[Teavent],
    ) -> Result<(), TeaveError> {
        match recurrence::next_after(self, now, exceptions)? {
            Some(date) => {
                self.shift_to(date);
                Ok(())
            }
            None => Err(TeaveError::FromThePast { id: self.id.clone(), now }),
        }
    }
}

/// Attach `offset` to a local wall-clock time.
pub(crate) fn at_offset(local: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::from_naive_utc_and_offset(local - offset, offset)
}

#[cfg(test)]
#[path = "teavent_tests.rs"]
mod tests;
