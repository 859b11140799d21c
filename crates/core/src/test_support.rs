// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for tests across the workspace.

use chrono::DateTime;

use crate::config::TeaventConfig;
use crate::teavent::{State, Teavent};

/// Weekly Mo/We/Fr practice in Tbilisi (UTC+4), anchored on Wednesday
/// 2024-07-31 21:00-23:00. Default poll anchors land at 16:00 / 19:00.
pub fn sample_teavent() -> Teavent {
    Teavent {
        id: "2gud232jsatd8pmnu0mnng0if2".to_string(),
        cal_id: "club@group.calendar.google.com".to_string(),
        summary: "Table tennis practice".to_string(),
        description: "Weekly table tennis practice".to_string(),
        location: Some("Arena 2, 2 University St, Tbilisi".to_string()),
        start: rfc3339("2024-07-31T21:00:00+04:00"),
        end: rfc3339("2024-07-31T23:00:00+04:00"),
        rrule: vec!["RRULE:FREQ=WEEKLY;WKST=MO;BYDAY=WE,MO,FR".to_string()],
        recurring_event_id: None,
        original_start_time: None,
        config: TeaventConfig { max: 5, min: 3, ..TeaventConfig::default() },
        communication_ids: vec!["chat-1".to_string()],
        participant_ids: vec![],
        latees: vec![],
        state: State::Created,
        effective_max: None,
    }
}

/// One-off (non-recurring) variant of [`sample_teavent`].
pub fn sample_oneoff_teavent() -> Teavent {
    Teavent { id: "oneoff-7f3k".to_string(), rrule: vec![], ..sample_teavent() }
}

/// Exception instance of the sample series, moved off its `date` slot.
pub fn sample_exception(series: &Teavent, date: &str) -> Teavent {
    let start = rfc3339(&format!("{date}T19:00:00+04:00"));
    Teavent {
        id: format!("{}_ex_{date}", series.id),
        rrule: vec![],
        recurring_event_id: Some(series.id.clone()),
        original_start_time: Some(rfc3339(&format!("{date}T21:00:00+04:00"))),
        start,
        end: start + chrono::TimeDelta::hours(2),
        ..series.clone()
    }
}

pub fn rfc3339(s: &str) -> DateTime<chrono::FixedOffset> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt,
        Err(e) => unreachable!("bad fixture datetime {s}: {e}"),
    }
}
