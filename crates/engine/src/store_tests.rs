// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::flow::Trigger;
use crate::test_support::FakeExecutor;
use teave_core::test_support::sample_teavent;
use teave_storage::MemoryStore;

fn listener_with_doubles() -> (StoreListener, Arc<MemoryStore>, Arc<FakeExecutor>) {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(FakeExecutor::new());
    let dyn_store: Arc<dyn TeaventStore> = store.clone();
    let dyn_executor: Arc<dyn Executor> = executor.clone();
    (StoreListener::new(dyn_store, dyn_executor), store, executor)
}

fn transition(trigger: Trigger, source: State, target: State) -> Transition {
    Transition { trigger, source, target, internal: false }
}

#[tokio::test]
async fn every_transition_upserts_the_document() {
    let (listener, store, executor) = listener_with_doubles();
    let mut teavent = sample_teavent();
    let id = teavent.id.clone();

    teavent.state = State::PollOpen;
    listener.after_transition(&transition(Trigger::StartPoll, State::Created, State::PollOpen), &teavent);
    assert_eq!(executor.tasks(None), [format!("{id}_db:update_1")]);

    teavent.participant_ids.push("u1".into());
    listener.after_transition(
        &Transition {
            trigger: Trigger::Confirm,
            source: State::PollOpen,
            target: State::PollOpen,
            internal: true,
        },
        &teavent,
    );
    // Writes are named by a monotonic update id so order is preserved.
    assert_eq!(
        executor.tasks(None),
        [format!("{id}_db:update_1"), format!("{id}_db:update_2")]
    );

    executor.run_all().await;
    let doc = store.get(&id).unwrap();
    assert_eq!(doc.state, State::PollOpen);
    assert_eq!(doc.participant_ids, ["u1".to_string()]);
}

#[tokio::test]
async fn entering_finalized_deletes_instead_of_writing() {
    let (listener, store, executor) = listener_with_doubles();
    let mut teavent = sample_teavent();
    let id = teavent.id.clone();

    teavent.state = State::Cancelled;
    listener.after_transition(&transition(Trigger::Cancel, State::PollOpen, State::Cancelled), &teavent);
    executor.run_all().await;
    assert!(store.get(&id).is_some());

    teavent.state = State::Finalized;
    let t = transition(Trigger::Finalize, State::Cancelled, State::Finalized);
    listener.after_transition(&t, &teavent);
    listener.on_enter(State::Finalized, &teavent);
    assert_eq!(executor.tasks(None), [format!("{id}_db:drop_2")]);

    executor.run_all().await;
    assert!(store.get(&id).is_none());
}

#[tokio::test]
async fn redelivered_state_writes_the_same_document() {
    let (listener, store, executor) = listener_with_doubles();
    let mut teavent = sample_teavent();
    teavent.state = State::PollOpen;

    let t = transition(Trigger::Init, State::PollOpen, State::PollOpen);
    listener.after_transition(&t, &teavent);
    executor.run_all().await;
    let first = serde_json::to_vec(&store.get(&teavent.id).unwrap()).unwrap();

    listener.after_transition(&t, &teavent);
    executor.run_all().await;
    let second = serde_json::to_vec(&store.get(&teavent.id).unwrap()).unwrap();
    assert_eq!(first, second);
}
