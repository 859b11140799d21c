// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain errors shared across the workspace.

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Errors raised by the domain model itself.
#[derive(Debug, Error)]
pub enum TeaveError {
    /// The calendar event description carried a malformed config block.
    #[error("failed to parse config from event description: {message}")]
    EventDescriptionParsing { message: String },

    /// A recurrence rule string did not parse or validate.
    #[error("invalid recurrence rule '{rule}': {message}")]
    Rrule { rule: String, message: String },

    /// A recurring teavent has no occurrence left after `now`.
    #[error("teavent {id} is from the past: no occurrence after {now}")]
    FromThePast { id: String, now: DateTime<FixedOffset> },

    /// A calendar payload could not be decoded.
    #[error("malformed calendar payload: {message}")]
    CalendarPayload { message: String },
}
