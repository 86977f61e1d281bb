use crate::models::{EntryPatch, QueueEntry};
use anyhow::Context;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Executor, Sqlite, SqlitePool, migrate::Migrator};
use std::fs;
use std::path::Path;

const ENTRY_COLUMNS: &str = "id, name, phone, created_at, status, sort_order, timer_state, timer_start_time, time_paused, notified_timestamp";

/// All entries in arrival (row) order. Callers sort by rank themselves.
pub async fn list_entries(pool: &SqlitePool) -> sqlx::Result<Vec<QueueEntry>> {
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entry ORDER BY seq"
    ))
    .fetch_all(pool)
    .await
}

pub async fn find_entry(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<QueueEntry>> {
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entry WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn append_entry(pool: &SqlitePool, entry: &QueueEntry) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO queue_entry (id, name, phone, created_at, status, sort_order, timer_state, timer_start_time, time_paused, notified_timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.name)
    .bind(&entry.phone)
    .bind(entry.created_at)
    .bind(entry.status)
    .bind(entry.order)
    .bind(entry.timer_state)
    .bind(entry.timer_start_time)
    .bind(entry.time_paused)
    .bind(entry.notified_timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update the fields present in `patch`, returning how many rows matched.
/// Runs on a pool or inside an open transaction.
pub async fn patch_entry<'e, E>(executor: E, id: &str, patch: &EntryPatch) -> sqlx::Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "UPDATE queue_entry
         SET status = COALESCE(?, status),
             sort_order = COALESCE(?, sort_order),
             timer_state = COALESCE(?, timer_state),
             timer_start_time = COALESCE(?, timer_start_time),
             time_paused = COALESCE(?, time_paused),
             notified_timestamp = COALESCE(?, notified_timestamp)
         WHERE id = ?",
    )
    .bind(patch.status)
    .bind(patch.order)
    .bind(patch.timer_state)
    .bind(patch.timer_start_time)
    .bind(patch.time_paused)
    .bind(patch.notified_timestamp)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}

/// Rewrite the rank of several entries in one transaction. Readers see
/// either all of the new ranks or none of them. An unknown id rolls the
/// whole batch back with `RowNotFound`.
pub async fn set_orders(pool: &SqlitePool, orders: &[(String, f64)]) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for (id, order) in orders {
        if patch_entry(&mut *tx, id, &EntryPatch::order(*order)).await? == 0 {
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }
    }
    tx.commit().await
}

/// Delete an entry, returning how many rows were affected
pub async fn delete_entry(pool: &SqlitePool, id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM queue_entry WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// Embed migrations from the `migrations` directory
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a pool on the database file at `path`.
pub async fn init_pool_at(path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to the database at {}", path.display()))?;
    Ok(pool)
}

/// Create the database file (if missing, or always when `force_recreate`)
/// and bring the schema up to date.
pub async fn create_db_if_needed_at(path: &Path, force_recreate: bool) -> anyhow::Result<()> {
    if force_recreate && path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove DB file at {}", path.display()))?;
    }
    let pool = init_pool_at(path).await?;
    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    pool.close().await;
    Ok(())
}
