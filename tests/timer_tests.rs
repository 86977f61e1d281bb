use walkin::config::Settings;
use walkin::models::{EntryStatus, QueueEntry, TimerState};
use walkin::timer::{ResponseTimer, TurnTimer, format_remaining};

const D: i64 = 420_000;
const T0: i64 = 1_700_000_000_000;

fn serving() -> QueueEntry {
    QueueEntry {
        id: "a".to_string(),
        name: "A".to_string(),
        phone: "62811".to_string(),
        created_at: 0,
        status: EntryStatus::Waiting,
        order: 1000.0,
        timer_state: TimerState::Idle,
        timer_start_time: None,
        time_paused: None,
        notified_timestamp: None,
    }
}

fn turn() -> TurnTimer {
    TurnTimer::from_settings(&Settings::default())
}

#[test]
fn idle_reports_full_duration() {
    let e = serving();
    for now in [0, T0, T0 + 10_000_000] {
        assert_eq!(turn().remaining(&e, now), D);
    }
    let view = turn().view(&e, T0);
    assert!(!view.critical);
    assert!(!view.expired);
}

#[test]
fn running_counts_down_and_flags_critical() {
    let mut e = serving();
    let patch = turn().start(&e, T0).unwrap();
    patch.apply_to(&mut e);
    assert_eq!(e.timer_state, TimerState::Running);
    assert_eq!(e.time_paused, Some(D));

    let view = turn().view(&e, T0 + 65_000);
    assert_eq!(view.remaining_ms, 355_000);
    assert!(!view.critical);

    let view = turn().view(&e, T0 + 365_000);
    assert_eq!(view.remaining_ms, 55_000);
    assert!(view.critical);
}

#[test]
fn running_floors_at_zero_without_changing_state() {
    let mut e = serving();
    turn().start(&e, T0).unwrap().apply_to(&mut e);
    let view = turn().view(&e, T0 + D + 90_000);
    assert_eq!(view.remaining_ms, 0);
    assert!(view.expired);
    assert_eq!(view.state, TimerState::Running);
}

#[test]
fn resume_continues_from_paused_value() {
    let mut e = serving();
    e.timer_state = TimerState::Paused;
    e.timer_start_time = Some(T0 - 220_000);
    e.time_paused = Some(200_000);

    // Frozen while paused.
    assert_eq!(turn().remaining(&e, T0 + 30_000), 200_000);

    let resume_at = T0 + 30_000;
    turn().start(&e, resume_at).unwrap().apply_to(&mut e);
    assert_eq!(turn().remaining(&e, resume_at), 200_000);
    assert_eq!(turn().remaining(&e, resume_at + 1_000), 199_000);
}

#[test]
fn pause_then_immediate_resume_keeps_time() {
    let mut e = serving();
    turn().start(&e, T0).unwrap().apply_to(&mut e);

    let pause_at = T0 + 123_456;
    let before = turn().remaining(&e, pause_at);
    turn().pause(&e, pause_at).unwrap().apply_to(&mut e);
    assert_eq!(e.timer_state, TimerState::Paused);
    turn().start(&e, pause_at + 5).unwrap().apply_to(&mut e);
    let after = turn().remaining(&e, pause_at + 5);
    assert!((before - after).abs() < 1_000, "{before} vs {after}");
}

#[test]
fn redundant_transitions_are_no_ops() {
    let mut e = serving();
    assert!(turn().pause(&e, T0).is_none());
    turn().start(&e, T0).unwrap().apply_to(&mut e);
    assert!(turn().start(&e, T0 + 1_000).is_none());
}

#[test]
fn response_window_expires_without_status_change() {
    let response = ResponseTimer::new(120_000);
    let mut e = serving();
    e.status = EntryStatus::Notified;
    e.notified_timestamp = Some(T0);

    let view = response.view(&e, T0 + 60_000).unwrap();
    assert_eq!(view.remaining_ms, 60_000);
    assert!(!view.expired);

    let view = response.view(&e, T0 + 125_000).unwrap();
    assert_eq!(view.remaining_ms, 0);
    assert!(view.expired);
    assert_eq!(e.status, EntryStatus::Notified);
}

#[test]
fn response_remaining_is_pure() {
    let response = ResponseTimer::new(180_000);
    for (notified, now) in [(T0, T0), (T0, T0 + 1), (T0, T0 + 179_999), (T0 + 5, T0)] {
        let first = response.remaining(notified, now);
        assert_eq!(first, response.remaining(notified, now));
        assert!((0..=180_000).contains(&first));
    }
}

#[test]
fn response_stamped_in_the_future_counts_as_just_sent() {
    let response = ResponseTimer::new(120_000);
    assert_eq!(response.remaining(T0 + 5_000, T0), 120_000);

    let mut e = serving();
    e.status = EntryStatus::Notified;
    e.notified_timestamp = Some(T0 + 60_000);
    let view = response.view(&e, T0).unwrap();
    assert_eq!(view.remaining_ms, 120_000);
    assert!(!view.expired);
}

#[test]
fn negative_duration_does_not_panic() {
    let turn = TurnTimer::new(-1, 60_000);
    let mut e = serving();
    e.timer_state = TimerState::Paused;
    e.time_paused = Some(30_000);
    assert_eq!(turn.remaining(&e, T0), 0);

    e.timer_state = TimerState::Running;
    e.timer_start_time = Some(T0);
    assert_eq!(turn.remaining(&e, T0 + 1_000), 0);
    assert!(turn.view(&e, T0 + 1_000).expired);
}

#[test]
fn response_view_only_for_notified_entries() {
    let response = ResponseTimer::new(120_000);
    let mut e = serving();
    e.notified_timestamp = Some(T0);
    e.status = EntryStatus::Confirmed;
    assert!(response.view(&e, T0).is_none());
    e.status = EntryStatus::Waiting;
    assert!(response.view(&e, T0).is_none());
}

#[test]
fn formats_minutes_and_seconds() {
    assert_eq!(format_remaining(420_000), "07:00");
    assert_eq!(format_remaining(55_999), "00:55");
    assert_eq!(format_remaining(-5), "00:00");
}
