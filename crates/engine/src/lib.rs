// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! teave-engine: the event manager core.
//!
//! A per-teavent state machine ([`flow`]), the grouped delayed-task
//! executor its timers run on ([`executor`]), the manager that owns the
//! flows and reacts to every transition ([`manager`]), and the listeners
//! that mirror transitions to the store and the outgoing update queue.

pub mod executor;
pub mod flow;
pub mod listener;
pub mod manager;
pub mod publish;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use executor::{Executor, Task, TokioExecutor};
pub use flow::{FlowError, GuardError, TeaventFlow, Transition, Trigger, TriggerCtx};
pub use listener::{TransitionListener, TransitionsLogger};
pub use manager::{ManagerError, TeaventManager, TimerFired};
pub use publish::{PublishError, PublisherListener, UpdatePublisher};
pub use store::StoreListener;
