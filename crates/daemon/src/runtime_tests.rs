// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::publisher::BroadcastPublisher;
use std::sync::Arc;
use std::time::Duration;
use teave_core::test_support::{rfc3339, sample_teavent};
use teave_core::{FakeClock, State, Teavent};
use teave_engine::{
    Executor, PublisherListener, StoreListener, TokioExecutor, Trigger, UpdatePublisher,
};
use teave_storage::{MemoryStore, TeaventStore};
use tokio::task::JoinHandle;

struct TestDaemon {
    rpc_tx: mpsc::Sender<RpcEnvelope>,
    store: Arc<MemoryStore>,
    updates: Arc<BroadcastPublisher>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestDaemon {
    /// Engine loop with real executor and in-memory collaborators. The
    /// clock is frozen hours before any poll anchor, so no timer fires
    /// during a test.
    fn spawn(now: &str) -> Self {
        let clock = FakeClock::at(rfc3339(now));
        let store = Arc::new(MemoryStore::new());
        let updates = Arc::new(BroadcastPublisher::new(16));
        let executor: Arc<dyn Executor> = Arc::new(TokioExecutor::new());

        let (rpc_tx, rpc_rx) = mpsc::channel(8);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let mut manager = TeaventManager::new(clock, Arc::clone(&executor), timer_tx);
        let dyn_store: Arc<dyn TeaventStore> = store.clone();
        manager.add_listener(Arc::new(StoreListener::new(dyn_store, Arc::clone(&executor))));
        let dyn_updates: Arc<dyn UpdatePublisher> = updates.clone();
        manager.add_listener(Arc::new(PublisherListener::new(dyn_updates, Arc::clone(&executor))));

        let runtime = Runtime::new(manager, rpc_rx, timer_rx, shutdown.clone());
        let handle = tokio::spawn(runtime.run());
        Self { rpc_tx, store, updates, shutdown, handle }
    }

    async fn call(&self, request: Request) -> Response {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.rpc_tx
            .send(RpcEnvelope { request, reply: reply_tx })
            .await
            .expect("engine loop gone");
        reply_rx.await.expect("engine loop dropped the reply")
    }

    async fn wait_for_doc(&self, id: &str) -> Teavent {
        for _ in 0..500 {
            if let Some(doc) = self.store.get(id) {
                return doc;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("document {id} never reached the store");
    }
}

const TEN_AM: &str = "2024-07-31T10:00:00+04:00";

#[tokio::test]
async fn ping_and_hello() {
    let daemon = TestDaemon::spawn(TEN_AM);
    assert_eq!(daemon.call(Request::Ping).await, Response::Pong);
    assert_eq!(
        daemon.call(Request::Hello { version: "tester".into() }).await,
        Response::Hello { version: PROTOCOL_VERSION.to_string() }
    );
}

#[tokio::test]
async fn manage_get_and_list() {
    let daemon = TestDaemon::spawn(TEN_AM);
    let teavent = sample_teavent();
    let id = teavent.id.clone();

    let managed = daemon.call(Request::ManageTeavent { teavent }).await;
    let Response::Teavent { teavent: managed } = managed else {
        panic!("expected a teavent, got {managed:?}");
    };
    assert_eq!(managed.state, State::Created);

    let got = daemon.call(Request::GetTeavent { id: id.clone() }).await;
    assert_eq!(got, Response::Teavent { teavent: managed.clone() });

    let listed = daemon.call(Request::ListTeavents).await;
    assert_eq!(listed, Response::Teavents { teavents: vec![managed.clone()] });

    // The store listener mirrored the init transition.
    let doc = daemon.wait_for_doc(&id).await;
    assert_eq!(doc, managed);
}

#[tokio::test]
async fn double_manage_surfaces_the_error_message() {
    let daemon = TestDaemon::spawn(TEN_AM);
    daemon.call(Request::ManageTeavent { teavent: sample_teavent() }).await;
    let response = daemon.call(Request::ManageTeavent { teavent: sample_teavent() }).await;
    let Response::Error { message } = response else {
        panic!("expected an error, got {response:?}");
    };
    assert!(message.contains("already managed"), "unexpected message: {message}");
}

#[tokio::test]
async fn user_actions_flow_through_and_are_published() {
    let daemon = TestDaemon::spawn(TEN_AM);
    let mut update_rx = daemon.updates.subscribe();
    let teavent = sample_teavent();
    let id = teavent.id.clone();

    daemon.call(Request::ManageTeavent { teavent }).await;
    let first = tokio::time::timeout(Duration::from_secs(1), update_rx.recv())
        .await
        .expect("no update for manage")
        .unwrap();
    assert_eq!(first.state, State::Created);

    let response = daemon
        .call(Request::UserAction {
            action: Trigger::Confirm,
            user_id: "u1".into(),
            teavent_id: id.clone(),
            force: true,
        })
        .await;
    let Response::Teavent { teavent: confirmed } = response else {
        panic!("expected a teavent, got {response:?}");
    };
    assert_eq!(confirmed.participant_ids, ["u1".to_string()]);

    let second = tokio::time::timeout(Duration::from_secs(1), update_rx.recv())
        .await
        .expect("no update for confirm")
        .unwrap();
    assert_eq!(second.participant_ids, ["u1".to_string()]);
}

#[tokio::test]
async fn guard_failures_come_back_as_errors() {
    let daemon = TestDaemon::spawn(TEN_AM);
    let teavent = sample_teavent();
    let id = teavent.id.clone();
    daemon.call(Request::ManageTeavent { teavent }).await;

    // Unforced confirm is not allowed while the teavent is still created.
    let response = daemon
        .call(Request::UserAction {
            action: Trigger::Confirm,
            user_id: "u1".into(),
            teavent_id: id,
            force: false,
        })
        .await;
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn unknown_ids_are_reported() {
    let daemon = TestDaemon::spawn(TEN_AM);
    let response = daemon.call(Request::GetTeavent { id: "nope".into() }).await;
    let Response::Error { message } = response else {
        panic!("expected an error, got {response:?}");
    };
    assert!(message.contains("unknown teavent"), "unexpected message: {message}");
}

#[tokio::test]
async fn tasks_lists_the_armed_timer() {
    let daemon = TestDaemon::spawn(TEN_AM);
    let teavent = sample_teavent();
    let id = teavent.id.clone();
    daemon.call(Request::ManageTeavent { teavent }).await;

    let Response::Tasks { tasks } = daemon.call(Request::Tasks).await else {
        panic!("expected tasks");
    };
    assert!(tasks.contains(&format!("{id}_sm:start_poll")), "tasks: {tasks:?}");
}

#[tokio::test]
async fn shutdown_stops_the_engine_loop() {
    let daemon = TestDaemon::spawn(TEN_AM);
    assert_eq!(daemon.call(Request::Shutdown).await, Response::Ok);
    assert!(daemon.shutdown.is_cancelled());
    tokio::time::timeout(Duration::from_secs(1), daemon.handle)
        .await
        .expect("engine loop did not stop")
        .unwrap();
}
