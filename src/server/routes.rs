use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct EvQuery {
    /// RFC 3339; defaults to now.
    pub cutoff: Option<String>,
    pub league: Option<String>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// GET /api/ev -- run the engine for one cutoff (blocking pool, SQLite)
pub async fn get_ev(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvQuery>,
) -> Response {
    let cutoff = match params.cutoff.as_deref().map(DateTime::<FixedOffset>::parse_from_rfc3339) {
        None => None,
        Some(Ok(ts)) => Some(ts.with_timezone(&Utc)),
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, format!("bad cutoff: {e}")),
    };

    let league = params.league;
    let result = tokio::task::spawn_blocking(move || state.run_ev(league, cutoff)).await;
    match result {
        Ok(Ok(table)) => Json(table).into_response(),
        Ok(Err(e)) => {
            tracing::error!("ev run failed: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => {
            tracing::error!("ev task panicked: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// GET /api/markets -- tracked markets with their source table and vig
pub async fn get_markets(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "markets": state.catalogue.tracked_markets(),
        "sportsbooks": state.catalogue.sportsbooks(),
    }))
}

/// GET /api/principal -- per-league principal and realized profit
pub async fn get_principal(
    State(state): State<Arc<AppState>>,
) -> Response {
    match tokio::task::spawn_blocking(move || state.principal()).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => {
            tracing::error!("principal report failed: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

#[derive(serde::Deserialize)]
pub struct PositionsQuery {
    pub league: Option<String>,
}

/// GET /api/positions -- active straights by participant, parlay legs
pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PositionsQuery>,
) -> Response {
    match tokio::task::spawn_blocking(move || state.positions(params.league)).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => {
            tracing::error!("positions report failed: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "runs_completed": state.counters.runs_completed.load(Relaxed),
        "runs_failed": state.counters.runs_failed.load(Relaxed),
        "wagers_allocated": state.counters.wagers_allocated.load(Relaxed),
        "wagers_excluded": state.counters.wagers_excluded.load(Relaxed),
        "quote_lookups": state.counters.quote_lookups.load(Relaxed),
        "quote_store_queries": state.counters.quote_store_queries.load(Relaxed),
    }))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
