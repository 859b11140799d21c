// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use teave_core::Teavent;

use crate::store::{StoreError, TeaventStore};

/// Map-backed [`TeaventStore`] with deterministic iteration order.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Teavent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a document, bypassing the listener path.
    pub fn seed(&self, teavent: Teavent) {
        self.docs.lock().insert(teavent.id.clone(), teavent);
    }

    pub fn get(&self, id: &str) -> Option<Teavent> {
        self.docs.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.lock().is_empty()
    }
}

#[async_trait]
impl TeaventStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Teavent>, StoreError> {
        Ok(self.docs.lock().values().cloned().collect())
    }

    async fn upsert(&self, teavent: &Teavent) -> Result<(), StoreError> {
        self.docs.lock().insert(teavent.id.clone(), teavent.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.docs.lock().remove(id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
