use clap::{Subcommand, ValueEnum};

/// Queue entry CLI subcommands
#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// List the queue in serving order
    List,
    /// Add a customer to the end of the queue
    Join {
        /// Customer name
        name: String,
        /// Phone number; local numbers get the country code
        phone: String,
    },
    /// Mark a customer as called and print the message link
    Notify {
        /// Entry ID
        id: String,
    },
    /// Record the customer's answer to a call-up
    Reply {
        /// Entry ID
        id: String,
        /// Customer's answer
        #[arg(value_enum)]
        answer: ReplyArg,
    },
    /// Move an entry before or after another one
    Move {
        /// Entry ID to move
        id: String,
        /// Place immediately before this entry
        #[arg(long, conflicts_with = "after")]
        before: Option<String>,
        /// Place immediately after this entry
        #[arg(long)]
        after: Option<String>,
    },
    /// Put an entry ahead of whoever is being served
    Promote {
        /// Entry ID
        id: String,
    },
    /// Finish the current turn and serve this entry next
    Serve {
        /// Entry ID
        id: String,
    },
    /// Remove an entry from the queue
    Remove {
        /// Entry ID
        id: String,
    },
}

/// Turn timer CLI subcommands (act on the now-serving entry)
#[derive(Subcommand, Debug)]
pub enum TimerCommands {
    /// Start or resume the turn timer
    Start,
    /// Pause the turn timer
    Pause,
    /// Finish the current turn and remove the entry
    Finish,
    /// Show the turn timer
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReplyArg {
    Yes,
    No,
}

impl From<ReplyArg> for Reply {
    fn from(arg: ReplyArg) -> Self {
        match arg {
            ReplyArg::Yes => Reply::Yes,
            ReplyArg::No => Reply::No,
        }
    }
}

use crate::board::QueueSnapshot;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, Settings};
use crate::db;
use crate::error::{QueueError, Result};
use crate::models::{EntryPatch, EntryStatus, QueueEntry, TimerState};
use crate::notify::{Notification, Reply, Template, normalize_phone};
use crate::ordering::{self, OrderingError, Placement};
use crate::timer::{TurnTimer, format_remaining};
use anyhow::Context;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Queue operations over an injected store pool.
///
/// Mutations take an in-process write lock so that two requests never
/// compute ranks from the same stale listing. Separate processes sharing a
/// database can still race; there is no version column.
#[derive(Clone)]
pub struct QueueService {
    pool: SqlitePool,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    writes: Arc<Mutex<()>>,
}

impl QueueService {
    pub fn new(pool: SqlitePool, settings: Settings) -> Self {
        Self::with_clock(pool, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
            clock,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn turn_timer(&self) -> TurnTimer {
        TurnTimer::from_settings(&self.settings)
    }

    /// The whole queue in serving order.
    pub async fn list(&self) -> Result<Vec<QueueEntry>> {
        let mut entries = db::list_entries(&self.pool).await?;
        ordering::sort_entries(&mut entries);
        Ok(entries)
    }

    pub async fn snapshot(&self, limit: Option<usize>) -> Result<QueueSnapshot> {
        let entries = self.list().await?;
        Ok(QueueSnapshot::build(&entries, &self.settings, self.now(), limit))
    }

    pub async fn get(&self, id: &str) -> Result<QueueEntry> {
        db::find_entry(&self.pool, id)
            .await?
            .ok_or_else(|| QueueError::entry_not_found(id))
    }

    /// Add a customer to the back of the queue.
    pub async fn join(&self, name: &str, phone: &str) -> Result<QueueEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueueError::Validation("name is required".into()));
        }
        let phone = normalize_phone(phone, &self.settings.country_code)
            .ok_or_else(|| QueueError::Validation("phone is required".into()))?;

        let _guard = self.writes.lock().await;
        let existing = db::list_entries(&self.pool).await?;
        let entry = QueueEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone,
            created_at: self.now(),
            status: EntryStatus::Waiting,
            order: ordering::append_order(&existing),
            timer_state: TimerState::Idle,
            timer_start_time: None,
            time_paused: None,
            notified_timestamp: None,
        };
        db::append_entry(&self.pool, &entry).await?;
        tracing::info!(id = %entry.id, order = entry.order, "customer joined the queue");
        Ok(entry)
    }

    /// Call a customer up. Re-notifying restarts the response window.
    pub async fn notify(&self, id: &str) -> Result<Notification> {
        let _guard = self.writes.lock().await;
        let mut entry = self.get(id).await?;
        let template = Template::Initial;
        let patch = EntryPatch {
            status: Some(template.next_status()),
            notified_timestamp: Some(self.now()),
            ..EntryPatch::default()
        };
        self.patch(id, &patch).await?;
        patch.apply_to(&mut entry);
        tracing::info!(id, "customer notified");
        Ok(Notification::new(entry, template, &self.settings))
    }

    /// Record a notified customer's answer.
    pub async fn reply(&self, id: &str, reply: Reply) -> Result<Notification> {
        let _guard = self.writes.lock().await;
        let mut entry = self.get(id).await?;
        if entry.status != EntryStatus::Notified {
            return Err(QueueError::Validation(format!(
                "entry '{id}' is not awaiting a reply"
            )));
        }
        let template = reply.template();
        let patch = EntryPatch::status(template.next_status());
        self.patch(id, &patch).await?;
        patch.apply_to(&mut entry);
        tracing::info!(id, ?reply, status = ?entry.status, "reply recorded");
        Ok(Notification::new(entry, template, &self.settings))
    }

    /// Move an entry relative to another one.
    pub async fn move_entry(&self, id: &str, placement: &Placement) -> Result<QueueEntry> {
        let _guard = self.writes.lock().await;
        self.reorder(id, |sorted| ordering::reposition_order(sorted, id, placement))
            .await
    }

    /// Skip the line: rank the entry ahead of the now-serving one.
    pub async fn promote(&self, id: &str) -> Result<QueueEntry> {
        let _guard = self.writes.lock().await;
        self.reorder(id, |sorted| Ok(ordering::promote_order(sorted))).await
    }

    /// Finish the current turn and make `id` the now-serving entry.
    pub async fn serve(&self, id: &str) -> Result<QueueEntry> {
        let _guard = self.writes.lock().await;
        let sorted = self.list().await?;
        let target = sorted
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| QueueError::entry_not_found(id))?;
        let Some(head) = sorted.first() else {
            return Err(QueueError::entry_not_found(id));
        };
        if head.id == id {
            return Ok(target);
        }
        self.delete(&head.id).await?;
        tracing::info!(id = %head.id, "turn finished");
        let rest: Vec<QueueEntry> = sorted.iter().skip(1).cloned().collect();
        let mut entry = target;
        let patch = EntryPatch::order(head.order - 1.0);
        self.patch(id, &patch).await?;
        patch.apply_to(&mut entry);
        self.settle_timers(&rest, &entry).await?;
        tracing::info!(id, order = entry.order, "now serving");
        Ok(entry)
    }

    /// Start or resume the now-serving entry's turn timer.
    pub async fn start_timer(&self) -> Result<QueueEntry> {
        let _guard = self.writes.lock().await;
        let sorted = self.list().await?;
        let mut head = now_serving(&sorted)?.clone();
        if let Some(patch) = self.turn_timer().start(&head, self.now()) {
            self.patch(&head.id, &patch).await?;
            patch.apply_to(&mut head);
            tracing::info!(
                id = %head.id,
                remaining = %format_remaining(patch.time_paused.unwrap_or_default()),
                "turn timer started"
            );
        }
        self.settle_timers(&sorted, &head).await?;
        Ok(head)
    }

    /// Pause the now-serving entry's turn timer.
    pub async fn pause_timer(&self) -> Result<QueueEntry> {
        let _guard = self.writes.lock().await;
        let sorted = self.list().await?;
        let mut head = now_serving(&sorted)?.clone();
        if let Some(patch) = self.turn_timer().pause(&head, self.now()) {
            self.patch(&head.id, &patch).await?;
            patch.apply_to(&mut head);
            tracing::info!(
                id = %head.id,
                remaining = %format_remaining(patch.time_paused.unwrap_or_default()),
                "turn timer paused"
            );
        }
        Ok(head)
    }

    /// Complete the current turn, removing the now-serving entry.
    pub async fn finish(&self) -> Result<QueueEntry> {
        let _guard = self.writes.lock().await;
        let sorted = self.list().await?;
        let head = now_serving(&sorted)?.clone();
        self.delete(&head.id).await?;
        tracing::info!(id = %head.id, "turn finished");
        Ok(head)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.writes.lock().await;
        self.delete(id).await?;
        tracing::info!(id, "entry removed");
        Ok(())
    }

    /// Spread all ranks back out to multiples of the append increment.
    /// Returns how many entries were rewritten.
    pub async fn renumber(&self) -> Result<usize> {
        let _guard = self.writes.lock().await;
        let sorted = self.list().await?;
        self.renumber_locked(&sorted).await
    }

    async fn renumber_locked(&self, sorted: &[QueueEntry]) -> Result<usize> {
        let changes = ordering::renumber(sorted);
        if !changes.is_empty() {
            db::set_orders(&self.pool, &changes)
                .await
                .map_err(|err| match err {
                    // Deleted by another process since the listing.
                    sqlx::Error::RowNotFound => QueueError::NotFound("renumbered entry".into()),
                    other => other.into(),
                })?;
        }
        tracing::info!(rewritten = changes.len(), "queue renumbered");
        Ok(changes.len())
    }

    /// Shared path for every operation that only changes one entry's rank.
    /// Falls back to a renumber when the gap is exhausted, and renumbers
    /// afterwards when the new rank leaves a gap too small for next time.
    async fn reorder<F>(&self, id: &str, compute: F) -> Result<QueueEntry>
    where
        F: Fn(&[QueueEntry]) -> std::result::Result<f64, OrderingError>,
    {
        let mut sorted = self.list().await?;
        let mut entry = sorted
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| QueueError::entry_not_found(id))?;

        let computed = compute(&sorted);
        let order = match computed {
            Err(OrderingError::Exhausted { lower, upper }) => {
                tracing::warn!(lower, upper, "rank gap exhausted, renumbering");
                self.renumber_locked(&sorted).await?;
                sorted = self.list().await?;
                compute(&sorted)?
            }
            other => other?,
        };

        let patch = EntryPatch::order(order);
        self.patch(id, &patch).await?;
        patch.apply_to(&mut entry);
        tracing::info!(id, order, "entry reordered");

        self.settle_timers(&sorted, &entry).await?;
        let resorted = self.list().await?;
        if ordering::needs_renumber(&resorted) {
            self.renumber_locked(&resorted).await?;
        }
        self.get(id).await
    }

    /// Pause any running timer that no longer belongs to the head of the
    /// queue. `sorted` is the listing from before `changed` was written.
    async fn settle_timers(&self, sorted: &[QueueEntry], changed: &QueueEntry) -> Result<()> {
        let mut current: Vec<QueueEntry> = sorted
            .iter()
            .map(|e| if e.id == changed.id { changed.clone() } else { e.clone() })
            .collect();
        ordering::sort_entries(&mut current);
        let now = self.now();
        let turn = self.turn_timer();
        for entry in current.iter().skip(1) {
            if let Some(patch) = turn.pause(entry, now) {
                self.patch(&entry.id, &patch).await?;
                tracing::info!(id = %entry.id, "paused timer of entry no longer being served");
            }
        }
        Ok(())
    }

    async fn patch(&self, id: &str, patch: &EntryPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(QueueError::Validation("nothing to update".into()));
        }
        match db::patch_entry(&self.pool, id, patch).await? {
            0 => Err(QueueError::entry_not_found(id)),
            _ => Ok(()),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match db::delete_entry(&self.pool, id).await? {
            0 => Err(QueueError::entry_not_found(id)),
            _ => Ok(()),
        }
    }
}

fn now_serving(sorted: &[QueueEntry]) -> Result<&QueueEntry> {
    sorted
        .first()
        .ok_or_else(|| QueueError::NotFound("now-serving entry".into()))
}

/// Initialize the pool, ensuring the database exists first.
pub async fn init_pool(cfg: &Config) -> anyhow::Result<SqlitePool> {
    db::create_db_if_needed_at(&cfg.db_path, cfg.force_recreate).await?;
    let pool = db::init_pool_at(&cfg.db_path).await?;
    Ok(pool)
}

/// Build a service from configuration.
pub async fn connect(cfg: &Config) -> anyhow::Result<QueueService> {
    let pool = init_pool(cfg).await?;
    Ok(QueueService::new(pool, cfg.settings.clone()))
}

fn print_entry(position: usize, e: &QueueEntry) {
    println!(
        "{:<4} {:<36} {:<20} {:<14} {:<10} {:>12}",
        position,
        e.id,
        e.name,
        e.phone,
        format!("{:?}", e.status).to_lowercase(),
        e.order
    );
}

fn print_notification(n: &Notification) {
    println!("{}", n.message);
    println!();
    println!("Open to send: {}", n.link);
}

/// Execute an entry command
pub async fn run_entry_command(cfg: &Config, cmd: EntryCommands) -> anyhow::Result<()> {
    let service = connect(cfg).await?;

    match cmd {
        EntryCommands::List => {
            let entries = service.list().await.context("Error listing queue")?;
            if entries.is_empty() {
                println!("The queue is empty");
            } else {
                println!(
                    "{:<4} {:<36} {:<20} {:<14} {:<10} {:>12}",
                    "POS", "ID", "NAME", "PHONE", "STATUS", "ORDER"
                );
                for (i, e) in entries.iter().enumerate() {
                    print_entry(i + 1, e);
                }
            }
        }
        EntryCommands::Join { name, phone } => {
            let e = service
                .join(&name, &phone)
                .await
                .context("Error joining queue")?;
            println!("Added '{}' with ID {} (order {})", e.name, e.id, e.order);
        }
        EntryCommands::Notify { id } => {
            let n = service.notify(&id).await.context("Error notifying customer")?;
            print_notification(&n);
        }
        EntryCommands::Reply { id, answer } => {
            let n = service
                .reply(&id, answer.into())
                .await
                .context("Error recording reply")?;
            println!("'{}' is now {:?}", n.entry.name, n.entry.status);
            print_notification(&n);
        }
        EntryCommands::Move { id, before, after } => {
            let placement = match (before, after) {
                (Some(t), None) => Placement::Before(t),
                (None, Some(t)) => Placement::After(t),
                _ => anyhow::bail!("Provide exactly one of --before or --after"),
            };
            let e = service
                .move_entry(&id, &placement)
                .await
                .context("Error moving entry")?;
            println!("Moved '{}' to order {}", e.name, e.order);
        }
        EntryCommands::Promote { id } => {
            let e = service.promote(&id).await.context("Error promoting entry")?;
            println!("'{}' is now being served (order {})", e.name, e.order);
        }
        EntryCommands::Serve { id } => {
            let e = service.serve(&id).await.context("Error serving entry")?;
            println!("'{}' is now being served (order {})", e.name, e.order);
        }
        EntryCommands::Remove { id } => {
            service.remove(&id).await.context("Error removing entry")?;
            println!("Removed entry {}", id);
        }
    }
    Ok(())
}

/// Execute a timer command
pub async fn run_timer_command(cfg: &Config, cmd: TimerCommands) -> anyhow::Result<()> {
    let service = connect(cfg).await?;
    let turn = TurnTimer::from_settings(service.settings());

    let entry = match cmd {
        TimerCommands::Start => service.start_timer().await.context("Error starting timer")?,
        TimerCommands::Pause => service.pause_timer().await.context("Error pausing timer")?,
        TimerCommands::Finish => {
            let e = service.finish().await.context("Error finishing turn")?;
            println!("Finished turn of '{}'", e.name);
            return Ok(());
        }
        TimerCommands::Show => {
            let sorted = service.list().await.context("Error listing queue")?;
            now_serving(&sorted)?.clone()
        }
    };
    let view = turn.view(&entry, service.now());
    println!(
        "'{}': {} remaining ({:?}{})",
        entry.name,
        format_remaining(view.remaining_ms),
        view.state,
        if view.critical { ", critical" } else { "" }
    );
    Ok(())
}
