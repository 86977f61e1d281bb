use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Notified,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// One customer's record and position in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueueEntry {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub created_at: i64,
    pub status: EntryStatus,
    #[sqlx(rename = "sort_order")]
    pub order: f64,
    pub timer_state: TimerState,
    pub timer_start_time: Option<i64>,
    pub time_paused: Option<i64>,
    pub notified_timestamp: Option<i64>,
}

/// Partial update of an entry; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub status: Option<EntryStatus>,
    pub order: Option<f64>,
    pub timer_state: Option<TimerState>,
    pub timer_start_time: Option<i64>,
    pub time_paused: Option<i64>,
    pub notified_timestamp: Option<i64>,
}

impl EntryPatch {
    pub fn order(order: f64) -> Self {
        Self { order: Some(order), ..Self::default() }
    }

    pub fn status(status: EntryStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.order.is_none()
            && self.timer_state.is_none()
            && self.timer_start_time.is_none()
            && self.time_paused.is_none()
            && self.notified_timestamp.is_none()
    }

    /// Apply the patch to an in-memory copy, mirroring what the store does.
    pub fn apply_to(&self, entry: &mut QueueEntry) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(order) = self.order {
            entry.order = order;
        }
        if let Some(state) = self.timer_state {
            entry.timer_state = state;
        }
        if let Some(start) = self.timer_start_time {
            entry.timer_start_time = Some(start);
        }
        if let Some(paused) = self.time_paused {
            entry.time_paused = Some(paused);
        }
        if let Some(ts) = self.notified_timestamp {
            entry.notified_timestamp = Some(ts);
        }
    }
}
