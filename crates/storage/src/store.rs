// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The document-store port.

use async_trait::async_trait;
use teave_core::Teavent;
use thiserror::Error;

/// Errors from a store driver.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document for {id}: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One document per teavent, keyed by id.
///
/// `fetch_all` feeds recovery; `upsert`/`delete` are driven by the store
/// listener after each transition. Drivers must tolerate repeated upserts
/// of the same state and deletes of absent documents.
#[async_trait]
pub trait TeaventStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Teavent>, StoreError>;
    async fn upsert(&self, teavent: &Teavent) -> Result<(), StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
