// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable mirroring of transitions into the document store.
//!
//! Writes for one teavent are serialized through its `<id>_db` executor
//! group, named with a monotonically increasing update id so ordering
//! survives even if the driver overlaps requests. Entering `finalized`
//! deletes the document instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use teave_core::{State, Teavent};
use teave_storage::TeaventStore;

use crate::executor::{Executor, Task};
use crate::flow::Transition;
use crate::listener::TransitionListener;

pub struct StoreListener {
    store: Arc<dyn TeaventStore>,
    executor: Arc<dyn Executor>,
    update_id: AtomicU64,
}

impl StoreListener {
    pub fn new(store: Arc<dyn TeaventStore>, executor: Arc<dyn Executor>) -> Self {
        Self { store, executor, update_id: AtomicU64::new(0) }
    }

    fn next_update_id(&self) -> u64 {
        self.update_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl TransitionListener for StoreListener {
    fn after_transition(&self, t: &Transition, teavent: &Teavent) {
        if t.target.is_final() {
            // The document is removed on entering `finalized`.
            return;
        }
        let n = self.next_update_id();
        let store = Arc::clone(&self.store);
        let snapshot = teavent.clone();
        let task = Task::new(format!("{}_db", teavent.id), format!("update_{n}"), async move {
            if let Err(first) = store.upsert(&snapshot).await {
                tracing::warn!(teavent = %snapshot.id, error = %first, "store upsert failed, retrying");
                if let Err(e) = store.upsert(&snapshot).await {
                    tracing::error!(teavent = %snapshot.id, error = %e, "store upsert failed after retry");
                }
            }
        });
        self.executor.schedule(task, 0);
    }

    fn on_enter(&self, state: State, teavent: &Teavent) {
        if state != State::Finalized {
            return;
        }
        let n = self.next_update_id();
        let store = Arc::clone(&self.store);
        let id = teavent.id.clone();
        let task = Task::new(format!("{id}_db"), format!("drop_{n}"), async move {
            if let Err(first) = store.delete(&id).await {
                tracing::warn!(teavent = %id, error = %first, "store delete failed, retrying");
                if let Err(e) = store.delete(&id).await {
                    tracing::error!(teavent = %id, error = %e, "store delete failed after retry");
                }
            }
        });
        self.executor.schedule(task, 0);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
