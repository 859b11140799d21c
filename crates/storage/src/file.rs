// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-backed JSON document store.
//!
//! One pretty-printed `<id>.json` per teavent. Writes go through a
//! temporary file and rename so readers never observe a torn document.

use async_trait::async_trait;
use std::path::PathBuf;
use teave_core::Teavent;

use crate::store::{StoreError, TeaventStore};

pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open (and create if needed) a document directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn doc_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl TeaventStore for JsonDirStore {
    async fn fetch_all(&self) -> Result<Vec<Teavent>, StoreError> {
        let mut teavents = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<Teavent>(&raw) {
                Ok(teavent) => teavents.push(teavent),
                // Malformed documents are fatal to the affected teavent
                // only; recovery proceeds with the rest.
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed document")
                }
            }
        }
        teavents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(teavents)
    }

    async fn upsert(&self, teavent: &Teavent) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(teavent)
            .map_err(|e| StoreError::Malformed { id: teavent.id.clone(), source: e })?;
        let path = self.doc_path(&teavent.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &payload).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(teavent = %teavent.id, state = %teavent.state, "wrote document");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.doc_path(id)).await {
            Ok(()) => {
                tracing::debug!(teavent = %id, "deleted document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for JsonDirStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDirStore").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
