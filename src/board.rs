//! The "now serving / up next" board.
//!
//! The board polls the store on a slow interval and re-derives both
//! countdowns every second from the last good snapshot. A failed poll keeps
//! the previous queue on screen next to an error banner; the next poll
//! tries again.

use crate::config::Settings;
use crate::error::Result;
use crate::models::QueueEntry;
use crate::queue::QueueService;
use crate::timer::{ResponseTimer, ResponseTimerView, TurnTimer, TurnTimerView, format_remaining};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;
use tokio::signal;

#[derive(Debug, Clone, Serialize)]
pub struct ServingView {
    pub entry: QueueEntry,
    pub timer: TurnTimerView,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitingView {
    /// 1-based queue position; now serving is position 1.
    pub position: usize,
    pub entry: QueueEntry,
    pub response: Option<ResponseTimerView>,
}

/// Derived view of the queue at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub generated_at: i64,
    pub total: usize,
    pub now_serving: Option<ServingView>,
    pub up_next: Vec<WaitingView>,
}

impl QueueSnapshot {
    /// `sorted` must already be in rank order. `limit` caps `up_next`.
    pub fn build(
        sorted: &[QueueEntry],
        settings: &Settings,
        now_ms: i64,
        limit: Option<usize>,
    ) -> Self {
        let turn = TurnTimer::from_settings(settings);
        let response = ResponseTimer::from_settings(settings);
        let now_serving = sorted.first().map(|entry| ServingView {
            entry: entry.clone(),
            timer: turn.view(entry, now_ms),
        });
        let up_next = sorted
            .iter()
            .enumerate()
            .skip(1)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(i, entry)| WaitingView {
                position: i + 1,
                entry: entry.clone(),
                response: response.view(entry, now_ms),
            })
            .collect();
        Self { generated_at: now_ms, total: sorted.len(), now_serving, up_next }
    }
}

/// Last known queue plus the error from the most recent failed refresh.
#[derive(Debug, Default)]
pub struct Board {
    entries: Vec<QueueEntry>,
    error: Option<String>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the result of a poll. Errors never clear what is on screen.
    pub fn apply_refresh(&mut self, result: Result<Vec<QueueEntry>>) {
        match result {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "queue refresh failed, keeping previous state");
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self, settings: &Settings, now_ms: i64, limit: Option<usize>) -> QueueSnapshot {
        QueueSnapshot::build(&self.entries, settings, now_ms, limit)
    }

    pub fn render(&self, settings: &Settings, now_ms: i64, limit: Option<usize>) -> String {
        let snap = self.snapshot(settings, now_ms, limit);
        let mut out = String::new();
        if let Some(err) = &self.error {
            let _ = writeln!(out, "!! {err}");
        }
        match &snap.now_serving {
            Some(s) => {
                let urgency = if s.timer.critical { " (!)" } else { "" };
                let _ = writeln!(
                    out,
                    "NOW SERVING: {}  [{}] {}{}",
                    s.entry.name.to_uppercase(),
                    format_remaining(s.timer.remaining_ms),
                    timer_label(&s.timer),
                    urgency
                );
            }
            None => {
                let _ = writeln!(out, "NOW SERVING: ---");
            }
        }
        if snap.up_next.is_empty() && snap.now_serving.is_none() {
            let _ = writeln!(out, "The queue is empty");
            return out;
        }
        let _ = writeln!(out, "UP NEXT:");
        for w in &snap.up_next {
            let response = match w.response {
                Some(r) if r.expired => "  no reply, time is up".to_string(),
                Some(r) => format!("  awaiting reply {}", format_remaining(r.remaining_ms)),
                None => String::new(),
            };
            let _ = writeln!(out, "{:>3}. {}{}", w.position, w.entry.name.to_uppercase(), response);
        }
        out
    }
}

fn timer_label(view: &TurnTimerView) -> &'static str {
    use crate::models::TimerState;
    match view.state {
        TimerState::Idle => "idle",
        TimerState::Running if view.expired => "time is up",
        TimerState::Running => "running",
        TimerState::Paused => "paused",
    }
}

/// Drive a board on stdout until Ctrl+C.
pub async fn run_board(service: QueueService, poll: Duration, limit: Option<usize>) -> anyhow::Result<()> {
    let mut board = Board::new();
    let mut poll_tick = tokio::time::interval(poll);
    let mut redraw_tick = tokio::time::interval(Duration::from_secs(1));
    tracing::info!(poll_ms = poll.as_millis() as u64, "board started - Use Ctrl+C to quit.");
    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                board.apply_refresh(service.list().await);
            }
            _ = redraw_tick.tick() => {
                // Clear screen and home the cursor before each frame.
                print!("\x1B[2J\x1B[H{}", board.render(service.settings(), service.now(), limit));
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, stopping board");
                break;
            }
        }
    }
    Ok(())
}
