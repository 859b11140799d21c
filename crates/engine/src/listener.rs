// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition observers.
//!
//! Each collaborator implements the subset of callbacks it cares about;
//! the manager invokes them after every successful transition with an
//! independent snapshot of the model. Listeners must tolerate seeing the
//! same state delivered again (re-entry fires again).

use teave_core::{State, Teavent};

use crate::flow::Transition;

pub trait TransitionListener: Send + Sync {
    /// Delivered after every successful transition, internal ones included.
    fn after_transition(&self, transition: &Transition, teavent: &Teavent) {
        let _ = (transition, teavent);
    }

    /// Delivered when a state is (re-)entered; internal transitions stay
    /// quiet.
    fn on_enter(&self, state: State, teavent: &Teavent) {
        let _ = (state, teavent);
    }
}

/// Logs every transition on the `transitions` target.
pub struct TransitionsLogger;

impl TransitionListener for TransitionsLogger {
    fn after_transition(&self, t: &Transition, teavent: &Teavent) {
        tracing::info!(
            target: "transitions",
            "{}: {} -({})-> {}",
            teavent.id,
            t.source,
            t.trigger,
            t.target
        );
    }
}
