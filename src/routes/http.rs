// Handlers: version, manual trigger, recent snapshots

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::scheduler::{TriggerError, TriggerOutcome};

const DEFAULT_SNAPSHOT_LIMIT: u32 = 100;
const MAX_SNAPSHOT_LIMIT: u32 = 5000;

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct TriggerParams {
    #[serde(default)]
    wait: bool,
}

/// POST /api/cycles: start a capture cycle now. With `?wait=true`, respond with its report.
pub(super) async fn trigger_cycle_handler(
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> Response {
    if params.wait {
        return match state.trigger.run_now().await {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(TriggerError::AlreadyRunning) => status_response(TriggerOutcome::AlreadyRunning),
            Err(TriggerError::Unavailable) => status_response(TriggerOutcome::Unavailable),
        };
    }
    status_response(state.trigger.trigger())
}

fn status_response(outcome: TriggerOutcome) -> Response {
    let (code, status) = match outcome {
        TriggerOutcome::Started => (StatusCode::ACCEPTED, "started"),
        TriggerOutcome::AlreadyRunning => (StatusCode::CONFLICT, "already_running"),
        TriggerOutcome::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };
    (code, Json(serde_json::json!({ "status": status }))).into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct SnapshotParams {
    server: Option<String>,
    limit: Option<u32>,
}

/// GET /api/snapshots: most recent audit rows, newest first.
pub(super) async fn snapshots_handler(
    State(state): State<AppState>,
    Query(params): Query<SnapshotParams>,
) -> Response {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SNAPSHOT_LIMIT)
        .clamp(1, MAX_SNAPSHOT_LIMIT);
    match state
        .history_repo
        .get_recent_snapshots(params.server.as_deref(), limit)
        .await
    {
        Ok(snapshots) => Json(snapshots).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "get_recent_snapshots", "snapshot listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "history unavailable" })),
            )
                .into_response()
        }
    }
}
