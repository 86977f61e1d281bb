use walkin::models::{EntryStatus, QueueEntry, TimerState};
use walkin::ordering::{
    ORDER_INCREMENT, OrderingError, Placement, append_order, drop_placement, needs_renumber,
    promote_order, renumber, reposition_order, sort_entries,
};

fn entry(id: &str, order: f64) -> QueueEntry {
    QueueEntry {
        id: id.to_string(),
        name: id.to_uppercase(),
        phone: "62811".to_string(),
        created_at: 0,
        status: EntryStatus::Waiting,
        order,
        timer_state: TimerState::Idle,
        timer_start_time: None,
        time_paused: None,
        notified_timestamp: None,
    }
}

fn ids(entries: &[QueueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.id.as_str()).collect()
}

fn apply(mut entries: Vec<QueueEntry>, id: &str, order: f64) -> Vec<QueueEntry> {
    for e in entries.iter_mut() {
        if e.id == id {
            e.order = order;
        }
    }
    sort_entries(&mut entries);
    entries
}

#[test]
fn appends_are_strictly_increasing() {
    let mut queue: Vec<QueueEntry> = Vec::new();
    let mut last = f64::NEG_INFINITY;
    for i in 0..50 {
        let order = append_order(&queue);
        assert!(order > last, "append {i} gave {order} after {last}");
        last = order;
        queue.push(entry(&format!("e{i}"), order));
    }
    assert_eq!(append_order(&[]), ORDER_INCREMENT);
}

#[test]
fn append_after_existing_entries() {
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0)];
    assert_eq!(append_order(&queue), 3000.0);
}

#[test]
fn drag_to_front_halves_first_rank() {
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0), entry("c", 3000.0)];
    let order = reposition_order(&queue, "b", &Placement::Onto("a".into())).unwrap();
    assert_eq!(order, 500.0);
    let queue = apply(queue, "b", order);
    assert_eq!(ids(&queue), vec!["b", "a", "c"]);
}

#[test]
fn drag_down_lands_after_target() {
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0), entry("c", 3000.0)];

    let order = reposition_order(&queue, "a", &Placement::Onto("b".into())).unwrap();
    assert_eq!(order, 2500.0);
    assert_eq!(ids(&apply(queue.clone(), "a", order)), vec!["b", "a", "c"]);

    let order = reposition_order(&queue, "a", &Placement::Onto("c".into())).unwrap();
    assert_eq!(order, 3000.0 + ORDER_INCREMENT);
    assert_eq!(ids(&apply(queue, "a", order)), vec!["b", "c", "a"]);
}

#[test]
fn drop_placement_follows_direction() {
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0), entry("c", 3000.0)];
    assert_eq!(drop_placement(&queue, "a", "c").unwrap(), Placement::After("c".into()));
    assert_eq!(drop_placement(&queue, "c", "a").unwrap(), Placement::Before("a".into()));
}

#[test]
fn reposition_lands_strictly_between_neighbours() {
    let pairs = [(1000.0, 2000.0), (-5.0, 3.0), (0.1, 0.2), (999.0, 1000.0), (1e9, 1e9 + 1.0)];
    for (a, b) in pairs {
        let queue = vec![entry("lo", a), entry("hi", b), entry("mover", b + 1000.0)];
        let after = reposition_order(&queue, "mover", &Placement::After("lo".into())).unwrap();
        assert!(a < after && after < b, "{a} < {after} < {b}");
        let before = reposition_order(&queue, "mover", &Placement::Before("hi".into())).unwrap();
        assert!(a < before && before < b, "{a} < {before} < {b}");
    }
}

#[test]
fn placing_after_own_predecessor_ignores_itself() {
    // b is already right after a; neighbours must skip b itself.
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0), entry("c", 3000.0)];
    let order = reposition_order(&queue, "b", &Placement::After("a".into())).unwrap();
    assert_eq!(order, 2000.0);
}

#[test]
fn before_first_with_non_positive_rank_steps_down() {
    let queue = vec![entry("a", 0.0), entry("b", 1000.0)];
    let order = reposition_order(&queue, "b", &Placement::Before("a".into())).unwrap();
    assert_eq!(order, -ORDER_INCREMENT);

    let queue = vec![entry("a", -10.0), entry("b", 1000.0)];
    let order = reposition_order(&queue, "b", &Placement::Before("a".into())).unwrap();
    assert!(order < -10.0);
}

#[test]
fn promote_goes_below_current_minimum() {
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0), entry("c", 3000.0)];
    let order = promote_order(&queue);
    assert_eq!(order, 999.0);
    assert!(order < 1000.0);

    let queue = vec![entry("x", -3.5), entry("y", 10.0)];
    assert!(promote_order(&queue) < -3.5);
    assert_eq!(promote_order(&[]), ORDER_INCREMENT);
}

#[test]
fn invalid_targets_are_rejected() {
    let queue = vec![entry("a", 1000.0), entry("b", 2000.0)];
    assert_eq!(
        reposition_order(&queue, "a", &Placement::Before("a".into())),
        Err(OrderingError::SelfTarget)
    );
    assert_eq!(
        reposition_order(&queue, "a", &Placement::After("zzz".into())),
        Err(OrderingError::UnknownEntry("zzz".into()))
    );
    assert_eq!(
        reposition_order(&queue, "ghost", &Placement::After("a".into())),
        Err(OrderingError::UnknownEntry("ghost".into()))
    );
}

#[test]
fn exhausted_gap_is_reported() {
    let lower = 1.0;
    let upper = 1.0 + f64::EPSILON;
    let queue = vec![entry("a", lower), entry("b", upper), entry("c", 5.0)];
    let err = reposition_order(&queue, "c", &Placement::After("a".into())).unwrap_err();
    assert_eq!(err, OrderingError::Exhausted { lower, upper });
}

#[test]
fn renumber_spreads_ranks_out() {
    let queue = vec![entry("a", 1.0), entry("b", 1.0000001), entry("c", 3000.0), entry("d", 9000.0)];
    assert!(needs_renumber(&queue));
    let changes = renumber(&queue);
    assert_eq!(
        changes,
        vec![("a".to_string(), 1000.0), ("b".to_string(), 2000.0), ("d".to_string(), 4000.0)]
    );

    let spaced = vec![entry("a", 1000.0), entry("b", 2000.0)];
    assert!(!needs_renumber(&spaced));
    assert!(renumber(&spaced).is_empty());
}

#[test]
fn equal_ranks_keep_store_order() {
    let mut queue = vec![entry("first", 5.0), entry("z", 1.0), entry("second", 5.0)];
    sort_entries(&mut queue);
    assert_eq!(ids(&queue), vec!["z", "first", "second"]);
}
