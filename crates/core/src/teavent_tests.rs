// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::PollAnchor;
use crate::test_support::{rfc3339, sample_teavent};
use chrono::NaiveTime;

#[test]
fn default_poll_anchors_bracket_the_start() {
    let teavent = sample_teavent();
    assert_eq!(teavent.start_poll_at().to_rfc3339(), "2024-07-31T16:00:00+04:00");
    assert_eq!(teavent.stop_poll_at().to_rfc3339(), "2024-07-31T19:00:00+04:00");
    assert!(teavent.start_poll_at() < teavent.stop_poll_at());
    assert!(teavent.stop_poll_at() < teavent.start);
}

#[test]
fn wall_clock_anchor_composes_with_the_event_date() {
    let mut teavent = sample_teavent();
    teavent.config.start_poll_at =
        Some(PollAnchor::WallClock(NaiveTime::from_hms_opt(11, 0, 0).unwrap()));
    assert_eq!(teavent.start_poll_at().to_rfc3339(), "2024-07-31T11:00:00+04:00");

    // Anchors follow the event when it shifts.
    teavent.shift_to("2024-08-05".parse().unwrap());
    assert_eq!(teavent.start_poll_at().to_rfc3339(), "2024-08-05T11:00:00+04:00");
}

#[test]
fn absolute_anchor_is_used_verbatim() {
    let mut teavent = sample_teavent();
    let at = rfc3339("2024-07-31T12:30:00+04:00");
    teavent.config.stop_poll_at = Some(PollAnchor::At(at));
    assert_eq!(teavent.stop_poll_at(), at);
}

#[test]
fn shift_to_preserves_time_of_day_and_duration() {
    let mut teavent = sample_teavent();
    let duration = teavent.duration();
    teavent.shift_to("2024-08-09".parse().unwrap());
    assert_eq!(teavent.start.to_rfc3339(), "2024-08-09T21:00:00+04:00");
    assert_eq!(teavent.duration(), duration);
    assert!(teavent.start < teavent.end);
}

#[test]
fn participant_split_at_config_max() {
    let mut teavent = sample_teavent();
    teavent.config.max = 5;
    teavent.participant_ids = (1..=6).map(|n| format!("u{n}")).collect();

    assert_eq!(teavent.effective_participant_ids().len(), 5);
    assert_eq!(teavent.reserve_participant_ids(), ["u6".to_string()]);
    assert!(teavent.has_reserve());
    assert!(teavent.confirmed_by("u6"));
    assert!(!teavent.confirmed_by("u7"));
}

#[test]
fn ready_tracks_config_min() {
    let mut teavent = sample_teavent();
    teavent.config.min = 3;
    teavent.participant_ids = vec!["u1".into(), "u2".into()];
    assert!(!teavent.ready());
    teavent.participant_ids.push("u3".into());
    assert!(teavent.ready());
}

#[test]
fn serde_roundtrip_preserves_identity_attributes() {
    let teavent = sample_teavent();
    let json = serde_json::to_string(&teavent).unwrap();
    let back: Teavent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, teavent);
    assert_eq!(back.tz(), teavent.tz());
}

#[test]
fn document_without_lifecycle_fields_defaults_them() {
    let json = r#"{
        "id": "t1",
        "summary": "practice",
        "start": "2024-07-31T21:00:00+04:00",
        "end": "2024-07-31T23:00:00+04:00"
    }"#;
    let teavent: Teavent = serde_json::from_str(json).unwrap();
    assert_eq!(teavent.state, State::Created);
    assert!(teavent.participant_ids.is_empty());
    assert!(teavent.latees.is_empty());
    assert!(!teavent.is_recurring());
    assert_eq!(teavent.effective_max, None);
    assert_eq!(teavent.config, TeaventConfig::default());
}

#[test]
fn state_display_matches_wire_names() {
    for (state, name) in [
        (State::Created, "created"),
        (State::PollOpen, "poll_open"),
        (State::Planned, "planned"),
        (State::Started, "started"),
        (State::Cancelled, "cancelled"),
        (State::Ended, "ended"),
        (State::Finalized, "finalized"),
    ] {
        assert_eq!(state.to_string(), name);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, format!("\"{name}\""));
    }
}
