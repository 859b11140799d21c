// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, grouped, delayed task runner.
//!
//! Tasks are identified by `(group_id, name)`. Within a group tasks run
//! strictly in submission order on a dedicated worker; groups are
//! independent of each other. Cancelling a group drops everything queued
//! and aborts the in-flight task at its next await point, so a cancelled
//! timer can never fire its transition.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of deferred work.
pub struct Task {
    pub group_id: String,
    pub name: String,
    pub future: TaskFuture,
}

impl Task {
    pub fn new(
        group_id: impl Into<String>,
        name: impl Into<String>,
        future: impl Future<Output = ()> + Send + 'static,
    ) -> Self {
        Self { group_id: group_id.into(), name: name.into(), future: Box::pin(future) }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({}:{})", self.group_id, self.name)
    }
}

/// Scheduling surface used by the manager and the listeners.
///
/// Scheduling into a `(group_id, name)` slot that is still pending is a
/// programmer error and asserts.
pub trait Executor: Send + Sync {
    fn schedule(&self, task: Task, delay_seconds: i64);
    fn cancel(&self, group_id: &str);
    /// Snapshot of pending `group:name` labels, for diagnostics.
    fn tasks(&self, group_id: Option<&str>) -> Vec<String>;
}

struct QueuedTask {
    name: String,
    delay_seconds: i64,
    future: TaskFuture,
}

struct Group {
    tx: mpsc::UnboundedSender<QueuedTask>,
    worker: JoinHandle<()>,
    names: HashSet<String>,
}

type GroupMap = Arc<Mutex<HashMap<String, Group>>>;

/// Tokio-backed [`Executor`] with one FIFO worker per live group.
///
/// A group's worker retires itself once its last task finishes; the next
/// schedule into that group spawns a fresh one.
#[derive(Clone, Default)]
pub struct TokioExecutor {
    groups: GroupMap,
}

impl TokioExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for TokioExecutor {
    fn schedule(&self, task: Task, delay_seconds: i64) {
        let Task { group_id, name, future } = task;
        let mut groups = self.groups.lock();
        let group = groups.entry(group_id.clone()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            let worker = spawn_worker(Arc::clone(&self.groups), group_id.clone(), rx);
            Group { tx, worker, names: HashSet::new() }
        });
        assert!(
            group.names.insert(name.clone()),
            "task {group_id}:{name} is already scheduled"
        );
        // The receiver lives as long as the map entry, which we hold.
        let _ = group.tx.send(QueuedTask { name, delay_seconds, future });
    }

    fn cancel(&self, group_id: &str) {
        let group = self.groups.lock().remove(group_id);
        if let Some(group) = group {
            tracing::debug!(group = %group_id, pending = group.names.len(), "cancelling task group");
            group.worker.abort();
        }
    }

    fn tasks(&self, group_id: Option<&str>) -> Vec<String> {
        let groups = self.groups.lock();
        let mut labels: Vec<String> = groups
            .iter()
            .filter(|(gid, _)| group_id.is_none_or(|want| want == gid.as_str()))
            .flat_map(|(gid, group)| group.names.iter().map(move |n| format!("{gid}:{n}")))
            .collect();
        labels.sort();
        labels
    }
}

fn spawn_worker(
    groups: GroupMap,
    group_id: String,
    mut rx: mpsc::UnboundedReceiver<QueuedTask>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            if task.delay_seconds < 0 {
                tracing::warn!(
                    group = %group_id,
                    task = %task.name,
                    delay = task.delay_seconds,
                    "negative delay, running immediately"
                );
            } else if task.delay_seconds > 0 {
                tokio::time::sleep(Duration::from_secs(task.delay_seconds as u64)).await;
            }

            task.future.await;

            let mut groups = groups.lock();
            let Some(group) = groups.get_mut(&group_id) else { break };
            group.names.remove(&task.name);
            if group.names.is_empty() {
                // Nothing queued either: every queued task holds its name.
                groups.remove(&group_id);
                break;
            }
        }
    })
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
