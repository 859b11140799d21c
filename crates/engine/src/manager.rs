// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The teavent manager: owns every flow, dispatches triggers, schedules
//! timers, and drops flows once they finalize.
//!
//! All mutation happens on whichever task owns the manager (the daemon's
//! engine loop). Timers never touch a flow directly: the scheduled task
//! sends a [`TimerFired`] message back into that loop, and the flow is
//! resolved by id at firing time, so a recreate in between cannot leave a
//! timer holding a stale machine.

use chrono::{DateTime, FixedOffset};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use teave_core::{Clock, State, Teavent};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::executor::{Executor, Task};
use crate::flow::{FlowError, TeaventFlow, Transition, Trigger, TriggerCtx};
use crate::listener::{TransitionListener, TransitionsLogger};

/// A timer round-trip: scheduled by the manager, delivered back to it by
/// the engine loop when the executor fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub teavent_id: String,
    pub trigger: Trigger,
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unknown teavent id: {id}")]
    UnknownTeavent { id: String },

    #[error("teavent {id} is already managed")]
    TeaventIsManaged { id: String },

    #[error("teavent {id} is in final state '{state}'")]
    TeaventIsInFinalState { id: String, state: State },

    #[error("cannot drop teavent {id} in non-final state '{state}'")]
    NotFinalized { id: String, state: State },

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// One queued trigger within a dispatch chain.
struct Pending {
    trigger: Trigger,
    user_id: Option<String>,
    force: bool,
    now_override: Option<DateTime<FixedOffset>>,
}

impl Pending {
    fn trigger(trigger: Trigger) -> Self {
        Self { trigger, user_id: None, force: false, now_override: None }
    }
}

pub struct TeaventManager<C: Clock> {
    clock: C,
    executor: Arc<dyn Executor>,
    listeners: Vec<Arc<dyn TransitionListener>>,
    flows: HashMap<String, TeaventFlow>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
}

impl<C: Clock> TeaventManager<C> {
    pub fn new(
        clock: C,
        executor: Arc<dyn Executor>,
        timer_tx: mpsc::UnboundedSender<TimerFired>,
    ) -> Self {
        Self {
            clock,
            executor,
            listeners: vec![Arc::new(TransitionsLogger)],
            flows: HashMap::new(),
            timer_tx,
        }
    }

    /// Install a transition listener. Listeners added here see every
    /// transition of every managed teavent.
    pub fn add_listener(&mut self, listener: Arc<dyn TransitionListener>) {
        self.listeners.push(listener);
    }

    pub fn list_teavents(&self) -> Vec<Teavent> {
        let mut teavents: Vec<Teavent> =
            self.flows.values().map(|f| f.teavent().clone()).collect();
        teavents.sort_by(|a, b| a.id.cmp(&b.id));
        teavents
    }

    pub fn get_teavent(&self, id: &str) -> Result<Teavent, ManagerError> {
        self.flows
            .get(id)
            .map(|f| f.teavent().clone())
            .ok_or_else(|| ManagerError::UnknownTeavent { id: id.to_string() })
    }

    /// Take ownership of a teavent and seat its machine at the declared
    /// state via `init`, which also normalizes recurring timings and arms
    /// the right timer.
    pub fn manage_teavent(&mut self, teavent: Teavent) -> Result<Teavent, ManagerError> {
        let id = teavent.id.clone();
        if self.flows.contains_key(&id) {
            return Err(ManagerError::TeaventIsManaged { id });
        }
        if teavent.state.is_final() {
            return Err(ManagerError::TeaventIsInFinalState { id, state: teavent.state });
        }

        tracing::info!(teavent = %id, state = %teavent.state, "managing teavent");
        self.flows.insert(id.clone(), TeaventFlow::new(teavent));

        match self.dispatch(&id, Pending::trigger(Trigger::Init)) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                // A teavent that cannot seat its machine is not managed.
                self.flows.remove(&id);
                self.executor.cancel(&sm_group(&id));
                Err(e)
            }
        }
    }

    /// Apply a user- or admin-initiated trigger to a managed teavent.
    pub fn handle_user_action(
        &mut self,
        trigger: Trigger,
        user_id: &str,
        teavent_id: &str,
        force: bool,
    ) -> Result<Teavent, ManagerError> {
        self.dispatch(
            teavent_id,
            Pending {
                trigger,
                user_id: Some(user_id.to_string()),
                force,
                now_override: None,
            },
        )
    }

    /// Deliver a fired timer.
    pub fn handle_timer(&mut self, fired: TimerFired) -> Result<Teavent, ManagerError> {
        self.dispatch(&fired.teavent_id, Pending::trigger(fired.trigger))
    }

    /// Explicitly remove a finalized flow.
    pub fn drop_teavent(&mut self, id: &str) -> Result<Teavent, ManagerError> {
        let flow = self
            .flows
            .get(id)
            .ok_or_else(|| ManagerError::UnknownTeavent { id: id.to_string() })?;
        if !flow.state().is_final() {
            return Err(ManagerError::NotFinalized { id: id.to_string(), state: flow.state() });
        }
        let flow = self.flows.remove(id).ok_or_else(|| ManagerError::UnknownTeavent {
            id: id.to_string(),
        })?;
        Ok(flow.into_teavent())
    }

    /// Pending executor task labels, for diagnostics.
    pub fn tasks(&self, group_id: Option<&str>) -> Vec<String> {
        self.executor.tasks(group_id)
    }

    /// Exception instances pointing at `series_id`, collected from the
    /// live flow map. Their presence is what excludes the underlying
    /// series occurrence.
    fn exceptions_for(&self, series_id: &str) -> Vec<Teavent> {
        self.flows
            .values()
            .map(|f| f.teavent())
            .filter(|t| t.recurring_event_id.as_deref() == Some(series_id))
            .cloned()
            .collect()
    }

    /// Run one trigger plus whatever follow-ups its transitions demand.
    fn dispatch(&mut self, id: &str, first: Pending) -> Result<Teavent, ManagerError> {
        let mut queue = VecDeque::new();
        let mut snapshot = self.step(id, first, &mut queue)?;
        while let Some(pending) = queue.pop_front() {
            snapshot = self.step(id, pending, &mut queue)?;
        }
        Ok(snapshot)
    }

    fn step(
        &mut self,
        id: &str,
        pending: Pending,
        queue: &mut VecDeque<Pending>,
    ) -> Result<Teavent, ManagerError> {
        let exceptions = self.exceptions_for(id);
        let tz = self
            .flows
            .get(id)
            .map(|f| f.teavent().tz())
            .ok_or_else(|| ManagerError::UnknownTeavent { id: id.to_string() })?;
        let now = pending.now_override.unwrap_or_else(|| self.clock.now(&tz));
        let ctx = TriggerCtx { user_id: pending.user_id, force: pending.force, now, exceptions };

        let flow = self
            .flows
            .get_mut(id)
            .ok_or_else(|| ManagerError::UnknownTeavent { id: id.to_string() })?;
        let transition = flow.send(pending.trigger, &ctx)?;
        let snapshot = flow.teavent().clone();

        for listener in &self.listeners {
            listener.after_transition(&transition, &snapshot);
            if !transition.internal {
                listener.on_enter(transition.target, &snapshot);
            }
        }

        if !transition.internal {
            if let Some(followup) = self.react(&transition, &snapshot) {
                queue.push_back(followup);
            }
        }
        Ok(snapshot)
    }

    /// The manager's own on-enter reactions.
    fn react(&mut self, transition: &Transition, snapshot: &Teavent) -> Option<Pending> {
        match transition.target {
            State::Created => {
                self.schedule_trigger(snapshot, Trigger::StartPoll, snapshot.start_poll_at());
                None
            }
            State::PollOpen => {
                self.schedule_trigger(snapshot, Trigger::StopPoll, snapshot.stop_poll_at());
                None
            }
            State::Planned => {
                self.schedule_trigger(snapshot, Trigger::Start, snapshot.start);
                None
            }
            State::Started => {
                self.schedule_trigger(snapshot, Trigger::End, snapshot.end);
                None
            }
            State::Cancelled | State::Ended => {
                if snapshot.is_recurring() {
                    // Anchor at the occurrence's end so the recreate can
                    // never resurrect the occurrence it just closed.
                    Some(Pending {
                        trigger: Trigger::Recreate,
                        user_id: None,
                        force: false,
                        now_override: Some(snapshot.end),
                    })
                } else {
                    Some(Pending::trigger(Trigger::Finalize))
                }
            }
            State::Finalized => {
                self.executor.cancel(&sm_group(&snapshot.id));
                self.flows.remove(&snapshot.id);
                tracing::info!(teavent = %snapshot.id, "finalized, dropping flow");
                None
            }
        }
    }

    /// Arm the single outstanding timer for a teavent. Any previously
    /// armed timer in its `<id>_sm` group is cancelled first.
    fn schedule_trigger(&self, teavent: &Teavent, trigger: Trigger, at: DateTime<FixedOffset>) {
        let group = sm_group(&teavent.id);
        self.executor.cancel(&group);

        let delay = (at - self.clock.now(&teavent.tz())).num_seconds();
        let tx = self.timer_tx.clone();
        let teavent_id = teavent.id.clone();
        tracing::info!(
            teavent = %teavent.id,
            trigger = %trigger,
            at = %at,
            delay_seconds = delay,
            "arming timer"
        );
        self.executor.schedule(
            Task::new(group, trigger.to_string(), async move {
                let _ = tx.send(TimerFired { teavent_id, trigger });
            }),
            delay,
        );
    }
}

fn sm_group(id: &str) -> String {
    format!("{id}_sm")
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
