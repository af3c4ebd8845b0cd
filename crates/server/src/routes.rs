use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Stat;
use service::storage::StoreRegistry;

use crate::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<StoreRegistry>,
}

pub async fn health() -> &'static str {
    "ok"
}

/// `GET /write/:group/:counter` — add 1 to the counter, creating the group
/// store and the counter as needed. The new value is persisted before the
/// response; the body is always the literal `ok`.
async fn write(
    State(state): State<AppState>,
    Path((group, counter)): Path<(String, String)>,
) -> Result<&'static str, ApiError> {
    let store = state.registry.get_or_open(&group).await?;
    store.increment(&counter).await?;
    Ok("ok")
}

/// `GET /stats/:group` — list every counter in the group with its hit
/// count. A key that vanishes between listing and reading counts as 0; any
/// other read failure aborts the whole response (no partial array).
async fn stats(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<Vec<Stat>>, ApiError> {
    let store = state.registry.get_or_open(&group).await?;
    let keys = store.keys().await;

    let mut stats = Vec::with_capacity(keys.len());
    for key in keys {
        let hit = store.get(&key).await?.unwrap_or(0);
        stats.push(Stat { group: key, hit });
    }
    Ok(Json(stats))
}

/// Build the application router: the three counter routes plus per-request
/// panic recovery and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/write/:group/:counter", get(write))
        .route("/stats/:group", get(stats))
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
