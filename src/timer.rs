//! Turn and response countdowns, derived from persisted instants.
//!
//! Nothing here ticks. Remaining time is recomputed from the stored start
//! timestamp on every observation, so a restart or reload lands on the same
//! value the previous process would have shown.

use crate::config::Settings;
use crate::models::{EntryPatch, EntryStatus, QueueEntry, TimerState};
use serde::Serialize;

/// Countdown for the entry currently being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimer {
    pub duration_ms: i64,
    pub critical_threshold_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnTimerView {
    pub state: TimerState,
    pub remaining_ms: i64,
    pub critical: bool,
    /// Ran out while running. The state is left as is; staff decide.
    pub expired: bool,
}

impl TurnTimer {
    pub fn new(duration_ms: i64, critical_threshold_ms: i64) -> Self {
        Self { duration_ms: duration_ms.max(0), critical_threshold_ms }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.turn_duration_ms, settings.critical_threshold_ms)
    }

    /// Time left at `now_ms`.
    pub fn remaining(&self, entry: &QueueEntry, now_ms: i64) -> i64 {
        match entry.timer_state {
            TimerState::Idle => self.duration_ms,
            TimerState::Paused => self.baseline(entry),
            TimerState::Running => {
                let started = entry.timer_start_time.unwrap_or(now_ms);
                let elapsed = (now_ms - started).max(0);
                (self.baseline(entry) - elapsed).max(0)
            }
        }
    }

    pub fn is_critical(&self, remaining_ms: i64) -> bool {
        remaining_ms <= self.critical_threshold_ms
    }

    pub fn view(&self, entry: &QueueEntry, now_ms: i64) -> TurnTimerView {
        let remaining_ms = self.remaining(entry, now_ms);
        TurnTimerView {
            state: entry.timer_state,
            remaining_ms,
            critical: self.is_critical(remaining_ms),
            expired: entry.timer_state == TimerState::Running && remaining_ms == 0,
        }
    }

    /// Patch that starts or resumes the countdown, or `None` when it is
    /// already running. The remaining time becomes the new baseline, so a
    /// resume continues where the pause left off.
    pub fn start(&self, entry: &QueueEntry, now_ms: i64) -> Option<EntryPatch> {
        if entry.timer_state == TimerState::Running {
            return None;
        }
        Some(EntryPatch {
            timer_state: Some(TimerState::Running),
            timer_start_time: Some(now_ms),
            time_paused: Some(self.remaining(entry, now_ms)),
            ..EntryPatch::default()
        })
    }

    /// Patch that freezes the countdown, or `None` when it is not running.
    pub fn pause(&self, entry: &QueueEntry, now_ms: i64) -> Option<EntryPatch> {
        if entry.timer_state != TimerState::Running {
            return None;
        }
        Some(EntryPatch {
            timer_state: Some(TimerState::Paused),
            time_paused: Some(self.remaining(entry, now_ms)),
            ..EntryPatch::default()
        })
    }

    // time_paused doubles as the baseline captured at the last start.
    fn baseline(&self, entry: &QueueEntry) -> i64 {
        entry
            .time_paused
            .map(|ms| ms.min(self.duration_ms).max(0))
            .unwrap_or(self.duration_ms)
    }
}

/// Countdown for a notified customer to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTimer {
    pub window_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseTimerView {
    pub remaining_ms: i64,
    pub expired: bool,
}

impl ResponseTimer {
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms: window_ms.max(0) }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.response_window_ms)
    }

    /// A notification stamped in the future (clock skew between writers)
    /// counts as just sent.
    pub fn remaining(&self, notified_at_ms: i64, now_ms: i64) -> i64 {
        let elapsed = (now_ms - notified_at_ms).max(0);
        (self.window_ms - elapsed).max(0)
    }

    /// Only entries still waiting on a reply have a response countdown.
    pub fn view(&self, entry: &QueueEntry, now_ms: i64) -> Option<ResponseTimerView> {
        if entry.status != EntryStatus::Notified {
            return None;
        }
        let notified_at = entry.notified_timestamp?;
        let remaining_ms = self.remaining(notified_at, now_ms);
        Some(ResponseTimerView { remaining_ms, expired: remaining_ms == 0 })
    }
}

/// `mm:ss` rendering used by the board and the CLI.
pub fn format_remaining(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
