// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing update publication.
//!
//! After every transition a cloned snapshot is queued for the presenter
//! through the per-teavent `<id>_pub` executor group, so publishes for one
//! teavent leave in transition order and drain even while new transitions
//! are being processed.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use teave_core::Teavent;
use thiserror::Error;

use crate::executor::{Executor, Task};
use crate::flow::Transition;
use crate::listener::TransitionListener;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport error: {message}")]
    Transport { message: String },
}

/// Where snapshots go. The broker transport behind it is a deployment
/// concern; duplicates are tolerated downstream.
#[async_trait]
pub trait UpdatePublisher: Send + Sync {
    async fn publish(&self, snapshot: &Teavent) -> Result<(), PublishError>;
}

/// Mirrors every transition onto the outgoing queue.
pub struct PublisherListener {
    publisher: Arc<dyn UpdatePublisher>,
    executor: Arc<dyn Executor>,
    update_id: AtomicU64,
}

impl PublisherListener {
    pub fn new(publisher: Arc<dyn UpdatePublisher>, executor: Arc<dyn Executor>) -> Self {
        Self { publisher, executor, update_id: AtomicU64::new(0) }
    }
}

impl TransitionListener for PublisherListener {
    fn after_transition(&self, t: &Transition, teavent: &Teavent) {
        let n = self.update_id.fetch_add(1, Ordering::Relaxed) + 1;
        let publisher = Arc::clone(&self.publisher);
        let snapshot = teavent.clone();
        let task = Task::new(
            format!("{}_pub", teavent.id),
            // The counter keeps rapid same-state re-entries from colliding
            // in the executor while preserving order.
            format!("{}_{n}", t.target),
            async move {
                if let Err(first) = publisher.publish(&snapshot).await {
                    tracing::warn!(teavent = %snapshot.id, error = %first, "publish failed, retrying");
                    if let Err(e) = publisher.publish(&snapshot).await {
                        tracing::error!(teavent = %snapshot.id, error = %e, "publish failed after retry");
                    }
                }
            },
        );
        self.executor.schedule(task, 0);
    }
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
