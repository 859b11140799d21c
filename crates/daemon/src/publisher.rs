// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update fan-out to subscribed connections.
//!
//! The engine's publisher listener hands snapshots here; subscriber
//! connections drain them as `Update` frames. Delivery is at-least-once
//! from the presenter's point of view (it re-reads the store on gaps), so
//! having no subscriber at publish time is not an error.

use async_trait::async_trait;
use teave_core::Teavent;
use teave_engine::{PublishError, UpdatePublisher};
use tokio::sync::broadcast;

pub struct BroadcastPublisher {
    tx: broadcast::Sender<Teavent>,
}

impl BroadcastPublisher {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self { tx }
    }

    /// New subscription handle for a `Subscribe`d connection.
    pub fn subscribe(&self) -> broadcast::Receiver<Teavent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl UpdatePublisher for BroadcastPublisher {
    async fn publish(&self, snapshot: &Teavent) -> Result<(), PublishError> {
        match self.tx.send(snapshot.clone()) {
            Ok(receivers) => {
                tracing::debug!(teavent = %snapshot.id, state = %snapshot.state, receivers, "published update");
            }
            Err(_) => {
                tracing::debug!(teavent = %snapshot.id, state = %snapshot.state, "no subscribers for update");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
