// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Every wall-clock read in the engine goes through a [`Clock`] so tests can
//! inject a frozen instant. Anchors in this domain are calendar datetimes,
//! so the clock speaks chrono rather than `Instant`.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current time projected into the given fixed offset.
    fn now(&self, tz: &FixedOffset) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(tz)
    }
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(now)) }
    }

    /// Construct from any offset-carrying datetime.
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self::new(now.with_timezone(&Utc))
    }

    /// Advance the clock by the given delta
    pub fn advance(&self, delta: TimeDelta) {
        *self.current.lock() += delta;
    }

    /// Set the clock to a specific instant
    pub fn set(&self, now: DateTime<Utc>) {
        *self.current.lock() = now;
    }
}

impl Clock for FakeClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
