// HTTP routes: health, version, manual capture trigger, snapshot listing

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::history_repo::HistoryRepo;
use crate::scheduler::TriggerHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) history_repo: Arc<HistoryRepo>,
    pub(crate) trigger: TriggerHandle,
}

pub fn app(history_repo: Arc<HistoryRepo>, trigger: TriggerHandle) -> Router {
    let state = AppState {
        history_repo,
        trigger,
    };
    Router::new()
        .route("/health", get(|| async { "OK" })) // GET /health
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/cycles", post(http::trigger_cycle_handler)) // POST /api/cycles[?wait=true]
        .route("/api/snapshots", get(http::snapshots_handler)) // GET /api/snapshots
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Serves `app` until `shutdown` resolves, then lets in-flight requests complete.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
