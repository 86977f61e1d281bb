use crate::board::QueueSnapshot;
use crate::config::Config;
use crate::error::QueueError;
use crate::models::QueueEntry;
use crate::notify::{Notification, Reply};
use crate::ordering::Placement;
use crate::queue::{self, QueueService};
use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;

type ApiResult<T> = Result<T, QueueError>;

/// Run the HTTP server on the given port
pub async fn run_server(cfg: &Config, port: u16) -> anyhow::Result<()> {
    // Store client is built once here and handed to every handler.
    let service = queue::connect(cfg).await?;
    let app = app_router(service);

    let addr = SocketAddr::from((cfg.bind_ip, port));
    tracing::info!("Listening on {} - Use Ctrl+C to quit.", addr);
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind address: {e}");
        anyhow!("Bind error: {e}")
    })?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {e}");
            }
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await
        .map_err(|e| {
            tracing::error!("Server error: {e}");
            anyhow!("Server error: {e}")
        })?;
    Ok(())
}

/// Construct the Axum `Router` for the service, injecting shared state.
pub fn app_router(service: QueueService) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // Display
        .route("/queue", get(queue_snapshot))
        // Entries
        .route("/entries", get(list_entries).post(join_queue))
        .route("/entries/{id}", get(show_entry).delete(remove_entry))
        .route("/entries/{id}/notify", post(notify_entry))
        .route("/entries/{id}/reply", post(reply_entry))
        .route("/entries/{id}/move", post(move_entry))
        .route("/entries/{id}/promote", post(promote_entry))
        .route("/entries/{id}/serve", post(serve_entry))
        // Now-serving turn
        .route("/serving/start", post(start_timer))
        .route("/serving/pause", post(pause_timer))
        .route("/serving/finish", post(finish_turn))
        .route("/maintenance/renumber", post(renumber))
        .with_state(service)
}

// Request payload for joining the queue
#[derive(Deserialize)]
struct JoinBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
}

// Request payload for answering a call-up
#[derive(Deserialize)]
struct ReplyBody {
    answer: Reply,
}

// Query parameters for the display snapshot
#[derive(Deserialize)]
struct SnapshotParams {
    limit: Option<usize>,
}

async fn queue_snapshot(
    Query(params): Query<SnapshotParams>,
    State(service): State<QueueService>,
) -> ApiResult<Json<QueueSnapshot>> {
    Ok(Json(service.snapshot(params.limit).await?))
}

async fn list_entries(State(service): State<QueueService>) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(service.list().await?))
}

async fn join_queue(
    State(service): State<QueueService>,
    Json(body): Json<JoinBody>,
) -> ApiResult<(StatusCode, Json<QueueEntry>)> {
    let entry = service.join(&body.name, &body.phone).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn show_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.get(&id).await?))
}

async fn remove_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
) -> ApiResult<StatusCode> {
    service.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn notify_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(service.notify(&id).await?))
}

async fn reply_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
    Json(body): Json<ReplyBody>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(service.reply(&id, body.answer).await?))
}

// Body is `{"before": id}`, `{"after": id}` or `{"onto": id}`
async fn move_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
    Json(placement): Json<Placement>,
) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.move_entry(&id, &placement).await?))
}

async fn promote_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.promote(&id).await?))
}

async fn serve_entry(
    Path(id): Path<String>,
    State(service): State<QueueService>,
) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.serve(&id).await?))
}

async fn start_timer(State(service): State<QueueService>) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.start_timer().await?))
}

async fn pause_timer(State(service): State<QueueService>) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.pause_timer().await?))
}

async fn finish_turn(State(service): State<QueueService>) -> ApiResult<Json<QueueEntry>> {
    Ok(Json(service.finish().await?))
}

async fn renumber(State(service): State<QueueService>) -> ApiResult<Json<serde_json::Value>> {
    let rewritten = service.renumber().await?;
    Ok(Json(json!({ "rewritten": rewritten })))
}
