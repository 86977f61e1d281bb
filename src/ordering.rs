//! Fractional rank keys for queue entries.
//!
//! Every entry carries an `f64` rank. Appending, promoting and dragging only
//! ever compute one new rank, so no other entry is rewritten. Repeated
//! insertion into the same gap eventually runs out of representable values;
//! [`needs_renumber`] detects that and [`renumber`] spreads the queue back
//! out on multiples of [`ORDER_INCREMENT`].

use crate::models::QueueEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gap left between consecutive appended entries.
pub const ORDER_INCREMENT: f64 = 1000.0;

/// Adjacent ranks closer than this are considered exhausted.
pub const MIN_GAP: f64 = 1e-6;

/// Where a moved entry should land relative to a target entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before(String),
    After(String),
    /// Drag-and-drop onto the target: lands after it when moving down the
    /// queue, before it when moving up.
    Onto(String),
}

impl Placement {
    pub fn target(&self) -> &str {
        match self {
            Placement::Before(t) | Placement::After(t) | Placement::Onto(t) => t,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum OrderingError {
    #[error("entry '{0}' is not in the queue")]
    UnknownEntry(String),

    #[error("cannot place an entry relative to itself")]
    SelfTarget,

    #[error("no rank left between {lower} and {upper}")]
    Exhausted { lower: f64, upper: f64 },
}

/// Sort ascending by rank. The sort is stable, so equal ranks keep the
/// store's row order.
pub fn sort_entries(entries: &mut [QueueEntry]) {
    entries.sort_by(|a, b| a.order.total_cmp(&b.order));
}

/// Rank for a newly joined entry.
pub fn append_order(entries: &[QueueEntry]) -> f64 {
    let highest = entries.iter().map(|e| e.order).fold(0.0_f64, f64::max);
    highest + ORDER_INCREMENT
}

/// Rank that puts an entry ahead of whoever is currently served.
pub fn promote_order(entries: &[QueueEntry]) -> f64 {
    entries
        .iter()
        .map(|e| e.order)
        .reduce(f64::min)
        .map(|lowest| lowest - 1.0)
        .unwrap_or(ORDER_INCREMENT)
}

/// Rank for `moving` so that it lands at `placement`. `sorted` is the
/// current full queue in rank order, now-serving included.
pub fn reposition_order(
    sorted: &[QueueEntry],
    moving: &str,
    placement: &Placement,
) -> Result<f64, OrderingError> {
    let target = placement.target();
    if target == moving {
        return Err(OrderingError::SelfTarget);
    }
    position(sorted, moving)?;
    let resolved = match placement {
        Placement::Onto(t) => drop_placement(sorted, moving, t)?,
        other => other.clone(),
    };

    // Neighbours are looked up with the moving entry taken out, otherwise
    // "after T" could resolve to the midpoint between T and itself.
    let others: Vec<&QueueEntry> = sorted.iter().filter(|e| e.id != moving).collect();
    let idx = others
        .iter()
        .position(|e| e.id == target)
        .ok_or_else(|| OrderingError::UnknownEntry(target.to_string()))?;
    let anchor = others[idx].order;

    match resolved {
        Placement::After(_) => match others.get(idx + 1) {
            Some(next) => midpoint(anchor, next.order),
            None => Ok(anchor + ORDER_INCREMENT),
        },
        _ => match idx.checked_sub(1).map(|i| others[i]) {
            Some(prev) => midpoint(prev.order, anchor),
            None => before_first(anchor),
        },
    }
}

/// Resolve a drop gesture into an explicit before/after placement.
pub fn drop_placement(
    sorted: &[QueueEntry],
    moving: &str,
    target: &str,
) -> Result<Placement, OrderingError> {
    if moving == target {
        return Err(OrderingError::SelfTarget);
    }
    let moving_idx = position(sorted, moving)?;
    let target_idx = position(sorted, target)?;
    if moving_idx < target_idx {
        Ok(Placement::After(target.to_string()))
    } else {
        Ok(Placement::Before(target.to_string()))
    }
}

/// True when some pair of neighbours sits too close for another midpoint.
pub fn needs_renumber(sorted: &[QueueEntry]) -> bool {
    sorted.windows(2).any(|w| w[1].order - w[0].order < MIN_GAP)
}

/// New ranks `(i + 1) * ORDER_INCREMENT` in current sequence. Only entries
/// whose rank actually changes are returned.
pub fn renumber(sorted: &[QueueEntry]) -> Vec<(String, f64)> {
    sorted
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            let order = (i as f64 + 1.0) * ORDER_INCREMENT;
            (e.order != order).then(|| (e.id.clone(), order))
        })
        .collect()
}

fn position(sorted: &[QueueEntry], id: &str) -> Result<usize, OrderingError> {
    sorted
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| OrderingError::UnknownEntry(id.to_string()))
}

fn midpoint(lower: f64, upper: f64) -> Result<f64, OrderingError> {
    let mid = lower + (upper - lower) / 2.0;
    if lower < mid && mid < upper {
        Ok(mid)
    } else {
        Err(OrderingError::Exhausted { lower, upper })
    }
}

fn before_first(first: f64) -> Result<f64, OrderingError> {
    let order = if first > 0.0 { first / 2.0 } else { first - ORDER_INCREMENT };
    if order < first {
        Ok(order)
    } else {
        Err(OrderingError::Exhausted { lower: f64::NEG_INFINITY, upper: first })
    }
}
