use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use diun_tracker_lib::{
    parse_payload, record_update, sorted_updates, summarize, RecordOutcome, Summary, UpdateMap,
    UpdateRecord,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::error::ApiError;
use super::metrics::metrics;
use super::state::AppState;
use super::store::StoreError;

pub const LIVENESS_MESSAGE: &str = "Diun-Homepage tracker is running and active.";

// ── GET / ────────────────────────────────────────────────────

pub async fn handle_home() -> (StatusCode, &'static str) {
    (StatusCode::OK, LIVENESS_MESSAGE)
}

// ── POST /webhook ────────────────────────────────────────────

/// Accept one notification. The body is parsed as JSON whatever the
/// `Content-Type` says.
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            metrics().webhook_total.with_label_values(&["bad_request"]).inc();
            return Err(e.into());
        }
    };

    match store_update(&state, &payload).await {
        Ok(outcome) => {
            metrics().webhook_total.with_label_values(&["ok"]).inc();
            debug!(
                image = %outcome.image,
                replaced = outcome.replaced,
                "stored update"
            );
            Ok(Json(serde_json::json!({"status": "success"})))
        }
        Err(e) => {
            metrics().webhook_total.with_label_values(&["error"]).inc();
            Err(e.into())
        }
    }
}

async fn store_update(
    state: &AppState,
    payload: &Map<String, Value>,
) -> Result<RecordOutcome, StoreError> {
    let _guard = state.write_lock.lock().await;

    let mut updates = state.load_updates().await?;
    let now = state.clock.now_millis();
    let outcome = record_update(&mut updates, payload, now);
    if outcome.cycle_reset {
        info!("new scan cycle detected, cleared previous updates");
        metrics().scan_cycle_resets.inc();
    }

    let start = Instant::now();
    state.store.save(&updates).await?;
    let m = metrics();
    m.store_save_duration.observe(start.elapsed().as_secs_f64());
    m.updates_tracked.set(updates.len() as i64);

    Ok(outcome)
}

// ── GET /updates ─────────────────────────────────────────────

pub async fn handle_updates(State(state): State<Arc<AppState>>) -> Result<Json<UpdateMap>, ApiError> {
    Ok(Json(state.load_updates().await?))
}

// ── GET /updates/list ────────────────────────────────────────

pub async fn handle_updates_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UpdateRecord>>, ApiError> {
    let updates = state.load_updates().await?;
    let list = sorted_updates(&updates).into_iter().cloned().collect();
    Ok(Json(list))
}

// ── GET /updates/summary ─────────────────────────────────────

pub async fn handle_updates_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Summary>, ApiError> {
    let updates = state.load_updates().await?;
    Ok(Json(summarize(&updates)))
}
