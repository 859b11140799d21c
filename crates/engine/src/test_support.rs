// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for the engine.

use parking_lot::Mutex;

use crate::executor::{Executor, Task, TaskFuture};

pub struct FakeTask {
    pub group_id: String,
    pub name: String,
    pub delay_seconds: i64,
    pub future: TaskFuture,
}

/// Records scheduled tasks and runs them only when asked, so tests can
/// step the engine one timer round at a time.
#[derive(Default)]
pub struct FakeExecutor {
    tasks: Mutex<Vec<FakeTask>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending task, leaving the queue empty.
    pub fn drain(&self) -> Vec<FakeTask> {
        std::mem::take(&mut *self.tasks.lock())
    }

    /// Run everything currently scheduled, regardless of delay.
    pub async fn run_all(&self) {
        for task in self.drain() {
            task.future.await;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Executor for FakeExecutor {
    fn schedule(&self, task: Task, delay_seconds: i64) {
        let mut tasks = self.tasks.lock();
        assert!(
            !tasks.iter().any(|t| t.group_id == task.group_id && t.name == task.name),
            "task {}:{} is already scheduled",
            task.group_id,
            task.name
        );
        tasks.push(FakeTask {
            group_id: task.group_id,
            name: task.name,
            delay_seconds,
            future: task.future,
        });
    }

    fn cancel(&self, group_id: &str) {
        self.tasks.lock().retain(|t| t.group_id != group_id);
    }

    fn tasks(&self, group_id: Option<&str>) -> Vec<String> {
        let tasks = self.tasks.lock();
        let mut labels: Vec<String> = tasks
            .iter()
            .filter(|t| group_id.is_none_or(|want| want == t.group_id))
            .map(|t| format!("{}:{}", t.group_id, t.name))
            .collect();
        labels.sort();
        labels
    }
}
