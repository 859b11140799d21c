// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-teavent state machine.
//!
//! The flow owns its teavent and applies one transition at a time. Guards
//! reject a trigger without touching the model; effects mutate the model
//! before the state switches. Listener fan-out and follow-up reactions are
//! the manager's job — the flow itself is pure state.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use teave_core::{simple_display, State, TeaveError, Teavent};
use thiserror::Error;

/// Transition triggers. Timed triggers (`StartPoll`, `StopPoll`, `Start`,
/// `End`) arrive from the scheduler; the rest from users or the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    StartPoll,
    Confirm,
    Reject,
    StopPoll,
    Start,
    IAmLate,
    End,
    Cancel,
    Recreate,
    Finalize,
    Init,
}

simple_display! {
    Trigger {
        StartPoll => "start_poll",
        Confirm => "confirm",
        Reject => "reject",
        StopPoll => "stop_poll",
        Start => "start",
        IAmLate => "i_am_late",
        End => "end",
        Cancel => "cancel",
        Recreate => "recreate",
        Finalize => "finalize",
        Init => "init",
    }
}

/// Ambient inputs for one trigger dispatch.
#[derive(Debug, Clone)]
pub struct TriggerCtx {
    pub user_id: Option<String>,
    /// Admin override: bypasses guards that restrict user-initiated flow.
    pub force: bool,
    pub now: DateTime<FixedOffset>,
    /// Exception instances of this teavent's series, if any.
    pub exceptions: Vec<Teavent>,
}

impl TriggerCtx {
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self { user_id: None, force: false, now, exceptions: Vec::new() }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// A successful transition. `internal` transitions mutate the model
/// without re-entering the state, so on-enter reactions stay quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub trigger: Trigger,
    pub source: State,
    pub target: State,
    pub internal: bool,
}

/// A guard rejected the trigger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("user {user_id} has already confirmed")]
    AlreadyConfirmed { user_id: String },

    #[error("user {user_id} has not confirmed")]
    NotConfirmed { user_id: String },

    #[error("no reserve to backfill a rejected participant")]
    NoReserve,

    #[error("teavent must be recurring")]
    NotRecurring,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("cannot {trigger} from state '{state}'")]
    TransitionNotAllowed { trigger: Trigger, state: State },

    #[error("teavent {id} is in final state '{state}'")]
    FinalState { id: String, state: State },

    #[error("{trigger} requires a user id")]
    MissingUserId { trigger: Trigger },

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Model(#[from] TeaveError),
}

/// State machine driving one teavent's lifecycle.
#[derive(Debug)]
pub struct TeaventFlow {
    teavent: Teavent,
}

impl TeaventFlow {
    pub fn new(teavent: Teavent) -> Self {
        Self { teavent }
    }

    pub fn state(&self) -> State {
        self.teavent.state
    }

    pub fn teavent(&self) -> &Teavent {
        &self.teavent
    }

    pub fn into_teavent(self) -> Teavent {
        self.teavent
    }

    /// Apply `trigger`, returning the transition taken.
    pub fn send(&mut self, trigger: Trigger, ctx: &TriggerCtx) -> Result<Transition, FlowError> {
        let source = self.teavent.state;
        match (trigger, source) {
            (Trigger::StartPoll, State::Created) => self.enter(trigger, source, State::PollOpen),

            (Trigger::Confirm, State::Created) if ctx.force => self.confirm(trigger, ctx),
            (Trigger::Confirm, State::PollOpen | State::Planned) => self.confirm(trigger, ctx),

            (Trigger::Reject, State::Created | State::PollOpen | State::Planned) => {
                if source == State::Planned && !ctx.force && !self.teavent.has_reserve() {
                    return Err(GuardError::NoReserve.into());
                }
                self.reject(trigger, ctx)
            }

            (Trigger::StopPoll, State::PollOpen) => {
                self.close_poll();
                let target =
                    if self.teavent.ready() { State::Planned } else { State::Cancelled };
                self.enter(trigger, source, target)
            }

            (Trigger::Start, State::Planned) => self.enter(trigger, source, State::Started),

            (Trigger::IAmLate, State::Started) => self.flag_late(trigger, ctx),

            (Trigger::End, State::Started) => self.enter(trigger, source, State::Ended),

            (Trigger::Cancel, State::Created | State::PollOpen | State::Planned) => {
                if source == State::PollOpen {
                    self.close_poll();
                }
                self.enter(trigger, source, State::Cancelled)
            }

            (Trigger::Recreate, State::Created | State::Cancelled | State::Ended) => {
                if !self.teavent.is_recurring() {
                    return Err(GuardError::NotRecurring.into());
                }
                self.teavent.adjust(ctx.now, &ctx.exceptions)?;
                self.teavent.participant_ids.clear();
                self.teavent.latees.clear();
                self.teavent.effective_max = None;
                self.enter(trigger, source, State::Created)
            }

            (Trigger::Finalize, State::Cancelled | State::Ended) => {
                self.enter(trigger, source, State::Finalized)
            }

            (Trigger::Init, state) if state.is_final() => Err(FlowError::FinalState {
                id: self.teavent.id.clone(),
                state,
            }),
            (Trigger::Init, state) => {
                if self.teavent.is_recurring() {
                    self.teavent.adjust(ctx.now, &ctx.exceptions)?;
                }
                self.enter(trigger, state, state)
            }

            (trigger, state) => Err(FlowError::TransitionNotAllowed { trigger, state }),
        }
    }

    fn enter(&mut self, trigger: Trigger, source: State, target: State) -> Result<Transition, FlowError> {
        self.teavent.state = target;
        Ok(Transition { trigger, source, target, internal: false })
    }

    fn internal(&self, trigger: Trigger, source: State) -> Result<Transition, FlowError> {
        Ok(Transition { trigger, source, target: source, internal: true })
    }

    fn confirm(&mut self, trigger: Trigger, ctx: &TriggerCtx) -> Result<Transition, FlowError> {
        let user_id = require_user(trigger, ctx)?;
        if self.teavent.confirmed_by(user_id) {
            return Err(GuardError::AlreadyConfirmed { user_id: user_id.to_string() }.into());
        }
        self.teavent.participant_ids.push(user_id.to_string());
        self.internal(trigger, self.teavent.state)
    }

    fn reject(&mut self, trigger: Trigger, ctx: &TriggerCtx) -> Result<Transition, FlowError> {
        let user_id = require_user(trigger, ctx)?;
        if !self.teavent.confirmed_by(user_id) {
            return Err(GuardError::NotConfirmed { user_id: user_id.to_string() }.into());
        }
        self.teavent.participant_ids.retain(|p| p != user_id);
        self.internal(trigger, self.teavent.state)
    }

    fn flag_late(&mut self, trigger: Trigger, ctx: &TriggerCtx) -> Result<Transition, FlowError> {
        let user_id = require_user(trigger, ctx)?;
        if !self.teavent.confirmed_by(user_id) {
            return Err(GuardError::NotConfirmed { user_id: user_id.to_string() }.into());
        }
        if !self.teavent.latees.iter().any(|l| l == user_id) {
            self.teavent.latees.push(user_id.to_string());
        }
        self.internal(trigger, self.teavent.state)
    }

    /// Snapshot the participant count on the way out of `poll_open`.
    fn close_poll(&mut self) {
        self.teavent.effective_max = Some(self.teavent.num_participants());
    }
}

fn require_user<'a>(trigger: Trigger, ctx: &'a TriggerCtx) -> Result<&'a str, FlowError> {
    ctx.user_id.as_deref().ok_or(FlowError::MissingUserId { trigger })
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
