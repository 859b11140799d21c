// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeExecutor;
use teave_core::test_support::{rfc3339, sample_exception, sample_oneoff_teavent, sample_teavent};
use teave_core::FakeClock;

struct Harness {
    manager: TeaventManager<FakeClock>,
    executor: Arc<FakeExecutor>,
    clock: FakeClock,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
}

impl Harness {
    fn at(now: &str) -> Self {
        let clock = FakeClock::at(rfc3339(now));
        let executor = Arc::new(FakeExecutor::new());
        let dyn_executor: Arc<dyn Executor> = executor.clone();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let manager = TeaventManager::new(clock.clone(), dyn_executor, timer_tx);
        Self { manager, executor, clock, timer_rx }
    }

    /// One scheduler round: run everything currently armed, then deliver
    /// the timers that fired.
    async fn tick(&mut self) {
        self.executor.run_all().await;
        while let Ok(fired) = self.timer_rx.try_recv() {
            self.manager.handle_timer(fired).unwrap();
        }
    }
}

#[tokio::test]
async fn created_teavent_opens_its_poll_when_the_anchor_passed() {
    // Managed between the start_poll anchor (16:00) and start (21:00).
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_teavent();
    let id = teavent.id.clone();

    h.manager.manage_teavent(teavent).unwrap();
    assert_eq!(h.executor.tasks(None), [format!("{id}_sm:start_poll")]);

    h.tick().await;
    assert_eq!(h.manager.get_teavent(&id).unwrap().state, State::PollOpen);
    assert_eq!(h.executor.tasks(None), [format!("{id}_sm:stop_poll")]);
}

#[tokio::test]
async fn quorum_poll_becomes_planned() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_teavent();
    let id = teavent.id.clone();

    h.manager.manage_teavent(teavent).unwrap();
    h.tick().await;

    for user in ["u1", "u2", "u3"] {
        h.manager.handle_user_action(Trigger::Confirm, user, &id, false).unwrap();
    }

    h.tick().await;
    let planned = h.manager.get_teavent(&id).unwrap();
    assert_eq!(planned.state, State::Planned);
    assert_eq!(planned.effective_max, Some(3));
    assert_eq!(planned.participant_ids, ["u1", "u2", "u3"]);
    assert_eq!(h.executor.tasks(None), [format!("{id}_sm:start")]);
}

#[tokio::test]
async fn empty_poll_cancels_and_recreates_on_the_next_occurrence() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_teavent();
    let id = teavent.id.clone();
    h.manager.manage_teavent(teavent).unwrap();

    h.tick().await; // -> poll_open
    h.tick().await; // stop_poll: no quorum -> cancelled -> recreate -> created

    let recreated = h.manager.get_teavent(&id).unwrap();
    assert_eq!(recreated.state, State::Created);
    // The recreate anchors at the occurrence's end (We 23:00); the Mo/We/Fr
    // grid continues on Friday.
    assert_eq!(recreated.start.to_rfc3339(), "2024-08-02T21:00:00+04:00");
    assert!(recreated.participant_ids.is_empty());
    assert_eq!(recreated.effective_max, None);
    assert!(h.clock.now(&recreated.tz()) < recreated.start_poll_at());
    assert_eq!(h.executor.tasks(None), [format!("{id}_sm:start_poll")]);
}

#[tokio::test]
async fn started_teavent_recovered_after_its_end_rolls_forward() {
    let mut h = Harness::at("2024-07-31T23:30:00+04:00");
    let mut teavent = sample_teavent();
    teavent.state = State::Started;
    teavent.participant_ids = vec!["u1".into(), "u2".into(), "u3".into()];
    let id = teavent.id.clone();

    h.manager.manage_teavent(teavent).unwrap();
    let managed = h.manager.get_teavent(&id).unwrap();
    assert_eq!(managed.state, State::Started);
    // init normalized the series onto its next occurrence and re-armed `end`.
    assert_eq!(managed.start.to_rfc3339(), "2024-08-02T21:00:00+04:00");
    assert_eq!(h.executor.tasks(None), [format!("{id}_sm:end")]);

    // The test executor delivers the timer without waiting out its delay.
    h.tick().await; // end -> ended -> recreate -> created
    let recreated = h.manager.get_teavent(&id).unwrap();
    assert_eq!(recreated.state, State::Created);
    assert_eq!(recreated.start.to_rfc3339(), "2024-08-05T21:00:00+04:00");
    assert!(recreated.participant_ids.is_empty());
}

#[tokio::test]
async fn exception_instances_exclude_their_slot_from_recreate() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let series = sample_teavent();
    let id = series.id.clone();
    let moved = sample_exception(&series, "2024-08-02");

    h.manager.manage_teavent(series).unwrap();
    h.manager.manage_teavent(moved).unwrap();

    h.manager.handle_user_action(Trigger::Cancel, "admin", &id, true).unwrap();
    let recreated = h.manager.get_teavent(&id).unwrap();
    assert_eq!(recreated.state, State::Created);
    // Friday is taken by the exception instance; the series jumps to Monday.
    assert_eq!(recreated.start.to_rfc3339(), "2024-08-05T21:00:00+04:00");
}

#[tokio::test]
async fn cancelled_one_off_finalizes_and_is_dropped() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_oneoff_teavent();
    let id = teavent.id.clone();
    h.manager.manage_teavent(teavent).unwrap();

    let last = h.manager.handle_user_action(Trigger::Cancel, "admin", &id, true).unwrap();
    assert_eq!(last.state, State::Finalized);
    assert!(h.manager.list_teavents().is_empty());
    assert!(h.executor.is_empty(), "finalize cancels the pending timer");
    assert!(matches!(
        h.manager.get_teavent(&id),
        Err(ManagerError::UnknownTeavent { .. })
    ));
}

#[tokio::test]
async fn finalized_document_is_refused() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let mut teavent = sample_oneoff_teavent();
    teavent.state = State::Finalized;

    let err = h.manager.manage_teavent(teavent).unwrap_err();
    assert!(matches!(err, ManagerError::TeaventIsInFinalState { .. }));
    assert!(h.manager.list_teavents().is_empty());
    assert!(h.executor.is_empty());
}

#[tokio::test]
async fn managing_twice_is_refused() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    h.manager.manage_teavent(sample_teavent()).unwrap();
    let err = h.manager.manage_teavent(sample_teavent()).unwrap_err();
    assert!(matches!(err, ManagerError::TeaventIsManaged { .. }));
    assert_eq!(h.manager.list_teavents().len(), 1);
}

#[tokio::test]
async fn series_with_no_future_occurrence_is_not_managed() {
    let mut h = Harness::at("2024-08-09T12:00:00+04:00");
    let mut teavent = sample_teavent();
    teavent.rrule = vec!["RRULE:FREQ=WEEKLY;BYDAY=WE;UNTIL=20240801T000000Z".to_string()];

    let err = h.manager.manage_teavent(teavent).unwrap_err();
    assert!(matches!(err, ManagerError::Flow(FlowError::Model(_))));
    assert!(h.manager.list_teavents().is_empty());
    assert!(h.executor.is_empty());
}

#[tokio::test]
async fn guard_failures_leave_the_state_untouched() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_teavent();
    let id = teavent.id.clone();
    h.manager.manage_teavent(teavent).unwrap();
    h.tick().await; // -> poll_open

    let err = h.manager.handle_user_action(Trigger::Reject, "ghost", &id, false).unwrap_err();
    assert!(matches!(err, ManagerError::Flow(FlowError::Guard(_))));
    assert_eq!(h.manager.get_teavent(&id).unwrap().state, State::PollOpen);
}

#[tokio::test]
async fn actions_on_unknown_teavents_are_reported() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let err = h.manager.handle_user_action(Trigger::Confirm, "u1", "nope", false).unwrap_err();
    assert!(matches!(err, ManagerError::UnknownTeavent { .. }));
}

#[tokio::test]
async fn drop_requires_a_final_state() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_teavent();
    let id = teavent.id.clone();
    h.manager.manage_teavent(teavent).unwrap();

    let err = h.manager.drop_teavent(&id).unwrap_err();
    assert!(matches!(err, ManagerError::NotFinalized { .. }));
    assert_eq!(h.manager.list_teavents().len(), 1);
}

#[tokio::test]
async fn at_most_one_timer_per_teavent() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");
    let teavent = sample_teavent();
    let id = teavent.id.clone();
    h.manager.manage_teavent(teavent).unwrap();

    h.tick().await;
    let sm_tasks = h.manager.tasks(Some(&format!("{id}_sm")));
    assert_eq!(sm_tasks.len(), 1, "exactly one outstanding timer: {sm_tasks:?}");
}

#[tokio::test]
async fn recovery_seats_each_document_in_its_stored_state() {
    let mut h = Harness::at("2024-07-31T17:00:00+04:00");

    let created = sample_teavent();
    let mut open = sample_teavent();
    open.id = "series-open".into();
    open.state = State::PollOpen;
    let mut planned = sample_oneoff_teavent();
    planned.id = "oneoff-planned".into();
    planned.state = State::Planned;
    planned.participant_ids = vec!["u1".into(), "u2".into(), "u3".into()];

    for doc in [created.clone(), open.clone(), planned.clone()] {
        h.manager.manage_teavent(doc).unwrap();
    }

    assert_eq!(h.manager.get_teavent(&created.id).unwrap().state, State::Created);
    assert_eq!(h.manager.get_teavent("series-open").unwrap().state, State::PollOpen);
    assert_eq!(h.manager.get_teavent("oneoff-planned").unwrap().state, State::Planned);

    // Each flow armed the timer matching its state.
    assert_eq!(h.manager.tasks(Some(&format!("{}_sm", created.id))), [format!("{}_sm:start_poll", created.id)]);
    assert_eq!(h.manager.tasks(Some("series-open_sm")), ["series-open_sm:stop_poll".to_string()]);
    assert_eq!(h.manager.tasks(Some("oneoff-planned_sm")), ["oneoff-planned_sm:start".to_string()]);
}
