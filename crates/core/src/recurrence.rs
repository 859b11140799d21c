// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurrence arithmetic for repeating teavents.
//!
//! Occurrences are computed in the event's local wall-clock frame: the
//! rule set is anchored at the series start's naive local datetime (pinned
//! to UTC for the rrule library), so BYDAY math follows the event's own
//! clock regardless of its fixed offset. Exception instances of the series
//! contribute EXDATEs at the series' time-of-day.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};

use crate::errors::TeaveError;
use crate::teavent::Teavent;

/// Upper bound on expanded occurrences per query. Exceptions only ever
/// exclude a handful of instances, so the first surviving occurrence is
/// found long before this.
const SCAN_LIMIT: u16 = 100;

/// First occurrence date strictly after `now`, or `None` when the rule
/// set is exhausted.
pub fn next_after(
    teavent: &Teavent,
    now: DateTime<FixedOffset>,
    exceptions: &[Teavent],
) -> Result<Option<NaiveDate>, TeaveError> {
    let anchor = teavent.original_start_time.unwrap_or(teavent.start);
    let start_local = anchor.naive_local();
    let dtstart = Tz::UTC.from_utc_datetime(&start_local);

    let mut set = RRuleSet::new(dtstart.clone());
    for raw in &teavent.rrule {
        let body = raw.strip_prefix("RRULE:").unwrap_or(raw);
        let parsed = body
            .parse::<RRule<Unvalidated>>()
            .map_err(|e| TeaveError::Rrule { rule: raw.clone(), message: e.to_string() })?;
        let rule = parsed
            .validate(dtstart.clone())
            .map_err(|e| TeaveError::Rrule { rule: raw.clone(), message: e.to_string() })?;
        set = set.rrule(rule);
    }

    for exception in exceptions {
        debug_assert!(exception.rrule.is_empty(), "exception instances carry no rrule");
        debug_assert_eq!(exception.recurring_event_id.as_deref(), Some(teavent.id.as_str()));
        let exdate = exception.start.naive_local().date().and_time(start_local.time());
        set = set.exdate(Tz::UTC.from_utc_datetime(&exdate));
    }

    // `after()` flipped inclusivity between rrule releases; filter
    // strictly-after ourselves instead of trusting the bound.
    let now_local = now.with_timezone(&teavent.tz()).naive_local();
    let result = set.after(Tz::UTC.from_utc_datetime(&now_local)).all(SCAN_LIMIT);

    Ok(result
        .dates
        .into_iter()
        .map(|d| d.naive_utc())
        .find(|d| *d > now_local)
        .map(|d| d.date()))
}

/// True when the series has no occurrence left after `now`.
pub fn is_last_occurrence(
    teavent: &Teavent,
    now: DateTime<FixedOffset>,
    exceptions: &[Teavent],
) -> Result<bool, TeaveError> {
    Ok(next_after(teavent, now, exceptions)?.is_none())
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
